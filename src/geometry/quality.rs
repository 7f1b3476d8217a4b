//! Convex quality and size estimates.
//!
//! Both estimates read the singular values of the Jacobian `K` at every
//! reference node of the convex:
//!
//! - quality: `1 / max cond(K)`, in `[0, 1]`. A right-angled unit element
//!   scores 1, a flat one 0.
//! - radius: `max σ_max(K) · √P / 2`, `P` the reference dimension. For an
//!   undistorted element this is half the reference diameter scaled by the
//!   element size.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::geometry::jacobian::SINGULAR_TOL;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::point::ConvexId;

impl Mesh {
    /// Inverse of the worst Jacobian condition number over the nodes of `cv`.
    pub fn convex_quality_estimate(&self, cv: ConvexId) -> Result<f64, MeshError> {
        let mut worst: f64 = 1.0;
        for sv in self.node_singular_values(cv)? {
            let (lo, hi) = extremes(&sv);
            if hi <= 0.0 || lo <= SINGULAR_TOL * hi {
                return Ok(0.0);
            }
            worst = worst.max(hi / lo);
        }
        Ok(1.0 / worst)
    }

    /// Size estimate of `cv`.
    pub fn convex_radius_estimate(&self, cv: ConvexId) -> Result<f64, MeshError> {
        let p = self.structure_of_convex(cv)?.dim() as f64;
        let sigma = self
            .node_singular_values(cv)?
            .iter()
            .map(|sv| extremes(sv).1)
            .fold(0.0, f64::max);
        Ok(sigma * p.sqrt() / 2.0)
    }

    /// Smallest [`convex_radius_estimate`](Self::convex_radius_estimate) over
    /// the mesh, `None` when it has no convex.
    pub fn minimal_convex_radius_estimate(&self) -> Result<Option<f64>, MeshError> {
        let mut min: Option<f64> = None;
        for cv in self.convex_ids() {
            let r = self.convex_radius_estimate(cv)?;
            min = Some(min.map_or(r, |m| m.min(r)));
        }
        Ok(min)
    }

    /// Quality of every convex, ascending id.
    pub fn convex_quality_estimates(&self) -> Result<Vec<(ConvexId, f64)>, MeshError> {
        let ids: Vec<ConvexId> = self.convex_ids().collect();
        #[cfg(feature = "rayon")]
        let it = ids.into_par_iter();
        #[cfg(not(feature = "rayon"))]
        let it = ids.into_iter();
        it.map(|cv| -> Result<(ConvexId, f64), MeshError> {
            Ok((cv, self.convex_quality_estimate(cv)?))
        })
        .collect()
    }

    fn node_singular_values(&self, cv: ConvexId) -> Result<Vec<Vec<f64>>, MeshError> {
        let nb = self.trans_of_convex(cv)?.nb_points();
        (0..nb)
            .map(|n| {
                let k = self.jacobian_at_node(cv, n)?;
                Ok(k.singular_values().as_slice().to_vec())
            })
            .collect()
    }
}

fn extremes(sv: &[f64]) -> (f64, f64) {
    sv.iter()
        .fold((f64::INFINITY, 0.0f64), |(lo, hi), &s| (lo.min(s), hi.max(s)))
}
