//! Node matrices and Jacobians of mesh convexes.

use nalgebra::{DMatrix, DVector};

use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::point::ConvexId;

/// Relative threshold under which a singular value counts as zero.
pub(crate) const SINGULAR_TOL: f64 = 1e-12;

impl Mesh {
    /// Coordinates of the nodes of `cv`, one column per node (`N × nb`).
    pub fn node_matrix(&self, cv: ConvexId) -> Result<DMatrix<f64>, MeshError> {
        let coords = self.points_of_convex(cv)?;
        let n = coords.first().map_or(0, |c| c.len());
        Ok(DMatrix::from_fn(n, coords.len(), |i, k| coords[k][i]))
    }

    /// Jacobian `K = X · ∇φ(ξ)` of `cv` at reference point `xi` (`N × P`).
    pub fn jacobian(&self, cv: ConvexId, xi: &[f64]) -> Result<DMatrix<f64>, MeshError> {
        let gt = self.trans_of_convex(cv)?;
        if xi.len() != gt.dim() {
            return Err(MeshError::PreconditionViolation(format!(
                "reference point of dimension {} for {gt}",
                xi.len()
            )));
        }
        Ok(self.node_matrix(cv)? * gt.gradients(xi))
    }

    /// Jacobian of `cv` at its reference node `n`, from the shared
    /// per-transformation precomputation.
    pub fn jacobian_at_node(&self, cv: ConvexId, n: usize) -> Result<DMatrix<f64>, MeshError> {
        let pc = self.precomp(self.trans_of_convex(cv)?);
        let grads = pc.gradients(n).ok_or_else(|| {
            MeshError::PreconditionViolation(format!(
                "{} has {} nodes, node {n} requested",
                pc.trans(),
                pc.nb_nodes()
            ))
        })?;
        Ok(self.node_matrix(cv)? * grads)
    }
}

/// `B = K (KᵀK)⁻¹`, the transpose of the pseudo-inverse of `K`.
pub(crate) fn pseudo_inverse_transpose(k: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let ktk = k.transpose() * k;
    let inv = ktk.try_inverse()?;
    Some(k * inv)
}

/// Euclidean normalization; `None` for a zero vector.
pub(crate) fn normalized(v: DVector<f64>) -> Option<DVector<f64>> {
    let n = v.norm();
    (n > 0.0 && n.is_finite()).then(|| v / n)
}
