//! Point location over a frozen mesh.
//!
//! [`MeshPrecomposite`] snapshots, for every convex, its node matrix and
//! bounding box, plus the inverse affine map of convexes whose
//! transformation is linear. Locating a point tests the convexes whose box
//! holds it, nearest vertex first, and returns the first convex whose
//! reference element contains the inverse image.

use hashbrown::HashMap;
use nalgebra::{DMatrix, DVector};

use crate::geometry::jacobian::pseudo_inverse_transpose;
use crate::geometry::point_store::inf_distance;
use crate::geometry::transform::GeometricTransformation;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::point::ConvexId;

const NEWTON_ITERS: usize = 30;

#[derive(Clone, Debug)]
struct Element {
    gt: GeometricTransformation,
    nodes: DMatrix<f64>,
    lo: Vec<f64>,
    hi: Vec<f64>,
    /// `(origin, K⁺)` for linear transformations.
    affine: Option<(DVector<f64>, DMatrix<f64>)>,
}

/// Point locator built from a mesh.
#[derive(Clone, Debug)]
pub struct MeshPrecomposite {
    elements: Vec<(ConvexId, Element)>,
    by_id: HashMap<ConvexId, usize>,
    tol: f64,
}

impl MeshPrecomposite {
    pub fn new(mesh: &Mesh) -> Result<Self, MeshError> {
        let tol = mesh.eps().max(1e-12);
        let mut elements = Vec::with_capacity(mesh.nb_convex());
        for cv in mesh.convex_ids() {
            let gt = mesh.trans_of_convex(cv)?;
            let nodes = mesh.node_matrix(cv)?;
            let (lo, hi) = column_box(&nodes);
            let affine = if gt.is_linear() {
                let origin = nodes.column(0).into_owned();
                let k = mesh.jacobian_at_node(cv, 0)?;
                pseudo_inverse_transpose(&k).map(|b| (origin, b.transpose()))
            } else {
                None
            };
            elements.push((cv, Element { gt, nodes, lo, hi, affine }));
        }
        let by_id = elements
            .iter()
            .enumerate()
            .map(|(i, (cv, _))| (*cv, i))
            .collect();
        Ok(Self { elements, by_id, tol })
    }

    pub fn nb_convex(&self) -> usize {
        self.elements.len()
    }

    /// Convex containing `x` and the reference coordinates of `x` in it.
    pub fn locate(&self, x: &[f64]) -> Option<(ConvexId, Vec<f64>)> {
        let mut candidates: Vec<(f64, usize)> = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, (_, e))| in_box(x, &e.lo, &e.hi, self.tol))
            .map(|(i, (_, e))| (nearest_vertex(&e.nodes, x), i))
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        candidates.into_iter().find_map(|(_, i)| {
            let (cv, e) = &self.elements[i];
            let xi = e.reference_point(x)?;
            (e.gt.structure().is_in(&xi) <= self.tol).then(|| (*cv, xi))
        })
    }

    /// Reference coordinates of `x` in `cv`, whether or not it lies inside.
    pub fn reference_point(&self, cv: ConvexId, x: &[f64]) -> Option<Vec<f64>> {
        let &i = self.by_id.get(&cv)?;
        self.elements[i].1.reference_point(x)
    }
}

impl Element {
    fn reference_point(&self, x: &[f64]) -> Option<Vec<f64>> {
        if x.len() != self.nodes.nrows() {
            return None;
        }
        let target = DVector::from_column_slice(x);
        if let Some((origin, kinv)) = &self.affine {
            return Some((kinv * (target - origin)).as_slice().to_vec());
        }
        // Gauss-Newton from the reference centroid.
        let mut xi = self.gt.structure().centroid();
        for _ in 0..NEWTON_ITERS {
            let r = &target - self.gt.transform(&xi, &self.nodes);
            let k = &self.nodes * self.gt.gradients(&xi);
            let kinv = pseudo_inverse_transpose(&k)?.transpose();
            let step = kinv * &r;
            for (a, s) in xi.iter_mut().zip(step.iter()) {
                *a += s;
            }
            if step.amax() < 1e-14 {
                break;
            }
        }
        Some(xi)
    }
}

fn column_box(nodes: &DMatrix<f64>) -> (Vec<f64>, Vec<f64>) {
    let lo = nodes.row_iter().map(|r| r.min()).collect();
    let hi = nodes.row_iter().map(|r| r.max()).collect();
    (lo, hi)
}

fn in_box(x: &[f64], lo: &[f64], hi: &[f64], tol: f64) -> bool {
    x.len() == lo.len()
        && x
            .iter()
            .zip(lo.iter().zip(hi))
            .all(|(&v, (&l, &h))| v >= l - tol && v <= h + tol)
}

fn nearest_vertex(nodes: &DMatrix<f64>, x: &[f64]) -> f64 {
    nodes
        .column_iter()
        .map(|c| inf_distance(c.as_slice(), x))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_triangle_holding_a_point() {
        let mut m = Mesh::new();
        let t0 = m
            .add_triangle_by_points(&[0.0, 0.0], &[1.0, 0.0], &[0.0, 1.0])
            .unwrap();
        let t1 = m
            .add_triangle_by_points(&[1.0, 0.0], &[1.0, 1.0], &[0.0, 1.0])
            .unwrap();
        let pc = MeshPrecomposite::new(&m).unwrap();
        assert_eq!(pc.nb_convex(), 2);

        let (cv, xi) = pc.locate(&[0.2, 0.3]).unwrap();
        assert_eq!(cv, t0);
        assert!((xi[0] - 0.2).abs() < 1e-12 && (xi[1] - 0.3).abs() < 1e-12);
        assert_eq!(pc.locate(&[0.9, 0.8]).unwrap().0, t1);
        assert!(pc.locate(&[1.5, 0.5]).is_none());
        assert!(pc.locate(&[0.5]).is_none());
    }

    #[test]
    fn inverts_a_distorted_quadrilateral() {
        let mut m = Mesh::new();
        let q = m
            .add_parallelepiped_by_points(
                2,
                &[&[0.0, 0.0], &[2.0, 0.0], &[0.0, 1.0], &[3.0, 2.0]],
            )
            .unwrap();
        let pc = MeshPrecomposite::new(&m).unwrap();
        let x = m.trans_of_convex(q).unwrap().transform(&[0.25, 0.75], &m.node_matrix(q).unwrap());
        let (cv, xi) = pc.locate(x.as_slice()).unwrap();
        assert_eq!(cv, q);
        assert!((xi[0] - 0.25).abs() < 1e-10 && (xi[1] - 0.75).abs() < 1e-10);
        assert!(pc.reference_point(ConvexId::new(9), x.as_slice()).is_none());
    }
}
