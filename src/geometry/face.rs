//! Face normals and local face bases.
//!
//! The normal of face `f` of a convex at reference point `ξ` is
//! `B(ξ) · n̂_f`, where `n̂_f` is the outward unit normal of the reference
//! face and `B = K (KᵀK)⁻¹`. It points outward but is not normalized: its
//! length is the ratio of reference to real face measure, which is what
//! boundary integrals need.

use nalgebra::{DMatrix, DVector};

use crate::geometry::jacobian::{normalized, pseudo_inverse_transpose};
use crate::mesh::Mesh;
use crate::mesh::convexes::bad_face;
use crate::mesh_error::MeshError;
use crate::topology::point::ConvexId;

impl Mesh {
    /// Outward normal of face `f` of `cv` at reference point `xi`.
    pub fn normal_of_face_of_convex(
        &self,
        cv: ConvexId,
        f: usize,
        xi: &[f64],
    ) -> Result<DVector<f64>, MeshError> {
        self.check_face(cv, f)?;
        let k = self.jacobian(cv, xi)?;
        self.normal_from_jacobian(cv, f, &k)
    }

    /// Outward normal of face `f` of `cv` at the `n`-th node of that face.
    pub fn normal_of_face_of_convex_at(
        &self,
        cv: ConvexId,
        f: usize,
        n: usize,
    ) -> Result<DVector<f64>, MeshError> {
        let node = self.face_node(cv, f, n)?;
        let k = self.jacobian_at_node(cv, node)?;
        self.normal_from_jacobian(cv, f, &k)
    }

    /// Unit outward normal of face `f` of `cv` at the `n`-th node of that face.
    pub fn unit_normal_of_face_of_convex(
        &self,
        cv: ConvexId,
        f: usize,
        n: usize,
    ) -> Result<DVector<f64>, MeshError> {
        normalized(self.normal_of_face_of_convex_at(cv, f, n)?)
            .ok_or_else(|| degenerate(cv))
    }

    /// Orthonormal `N × N` basis at face `f` of `cv`, reference point `xi`:
    /// column 0 is the unit outward normal, the others are tangents.
    pub fn local_basis_of_face_of_convex(
        &self,
        cv: ConvexId,
        f: usize,
        xi: &[f64],
    ) -> Result<DMatrix<f64>, MeshError> {
        self.check_face(cv, f)?;
        let k = self.jacobian(cv, xi)?;
        self.basis_from_jacobian(cv, f, &k)
    }

    /// [`local_basis_of_face_of_convex`](Self::local_basis_of_face_of_convex)
    /// at the `n`-th node of the face.
    pub fn local_basis_of_face_of_convex_at(
        &self,
        cv: ConvexId,
        f: usize,
        n: usize,
    ) -> Result<DMatrix<f64>, MeshError> {
        let node = self.face_node(cv, f, n)?;
        let k = self.jacobian_at_node(cv, node)?;
        self.basis_from_jacobian(cv, f, &k)
    }

    fn check_face(&self, cv: ConvexId, f: usize) -> Result<(), MeshError> {
        let s = self.structure_of_convex(cv)?;
        if f >= s.nb_faces() {
            return Err(bad_face(cv, f, s));
        }
        Ok(())
    }

    /// Local node number of the `n`-th node of face `f`.
    fn face_node(&self, cv: ConvexId, f: usize, n: usize) -> Result<usize, MeshError> {
        self.check_face(cv, f)?;
        let s = self.structure_of_convex(cv)?;
        s.ind_points_of_face(f).get(n).copied().ok_or_else(|| {
            MeshError::PreconditionViolation(format!("face {f} of convex {cv} has no node {n}"))
        })
    }

    fn normal_from_jacobian(
        &self,
        cv: ConvexId,
        f: usize,
        k: &DMatrix<f64>,
    ) -> Result<DVector<f64>, MeshError> {
        let s = self.structure_of_convex(cv)?;
        let b = pseudo_inverse_transpose(k).ok_or_else(|| degenerate(cv))?;
        Ok(b * DVector::from_vec(s.face_normal(f)))
    }

    fn basis_from_jacobian(
        &self,
        cv: ConvexId,
        f: usize,
        k: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, MeshError> {
        let normal = normalized(self.normal_from_jacobian(cv, f, k)?).ok_or_else(|| degenerate(cv))?;
        let n = normal.len();
        let mut basis: Vec<DVector<f64>> = vec![normal];
        // Gram-Schmidt over the columns of K first, so the tangents follow
        // the face, then over the canonical vectors to complete the basis.
        let candidates = k
            .column_iter()
            .map(|c| c.into_owned())
            .chain((0..n).map(|i| DVector::from_fn(n, |j, _| if i == j { 1.0 } else { 0.0 })));
        for mut v in candidates {
            if basis.len() == n {
                break;
            }
            let scale = v.norm();
            for e in &basis {
                let proj = e.dot(&v);
                v -= e * proj;
            }
            if v.norm() > 1e-8 * scale.max(1.0) {
                if let Some(u) = normalized(v) {
                    basis.push(u);
                }
            }
        }
        if basis.len() != n {
            return Err(degenerate(cv));
        }
        Ok(DMatrix::from_columns(&basis))
    }
}

fn degenerate(cv: ConvexId) -> MeshError {
    MeshError::PreconditionViolation(format!("convex {cv} is degenerate"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12)
    }

    fn reference_triangle() -> (Mesh, ConvexId) {
        let mut m = Mesh::new();
        let cv = m
            .add_triangle_by_points(&[0.0, 0.0], &[1.0, 0.0], &[0.0, 1.0])
            .unwrap();
        (m, cv)
    }

    #[test]
    fn reference_triangle_normals_point_outward() {
        let (m, cv) = reference_triangle();
        let s = 1.0 / 2f64.sqrt();
        let n0 = m.normal_of_face_of_convex(cv, 0, &[0.5, 0.5]).unwrap();
        assert!(close(n0.as_slice(), &[s, s]));
        let n1 = m.normal_of_face_of_convex_at(cv, 1, 0).unwrap();
        assert!(close(n1.as_slice(), &[-1.0, 0.0]));
        let n2 = m.unit_normal_of_face_of_convex(cv, 2, 1).unwrap();
        assert!(close(n2.as_slice(), &[0.0, -1.0]));
    }

    #[test]
    fn normal_scales_with_the_element() {
        let mut m = Mesh::new();
        let cv = m
            .add_triangle_by_points(&[0.0, 0.0], &[2.0, 0.0], &[0.0, 2.0])
            .unwrap();
        let n = m.normal_of_face_of_convex_at(cv, 1, 0).unwrap();
        assert!(close(n.as_slice(), &[-0.5, 0.0]));
    }

    #[test]
    fn local_basis_is_orthonormal() {
        let mut m = Mesh::new();
        let cv = m
            .add_tetrahedron_by_points(
                &[0.0, 0.0, 0.0],
                &[2.0, 0.1, 0.0],
                &[0.3, 1.0, 0.2],
                &[0.1, 0.2, 1.5],
            )
            .unwrap();
        let b = m.local_basis_of_face_of_convex(cv, 0, &[0.3, 0.3, 0.3]).unwrap();
        let gram = b.transpose() * &b;
        assert!((gram - DMatrix::identity(3, 3)).norm() < 1e-10);
        let unit = m.unit_normal_of_face_of_convex(cv, 0, 0).unwrap();
        assert!((b.column(0) - unit).norm() < 1e-10);
        let at = m.local_basis_of_face_of_convex_at(cv, 0, 0).unwrap();
        assert!((at - b).norm() < 1e-10);
    }

    #[test]
    fn out_of_range_requests_fail() {
        let (m, cv) = reference_triangle();
        assert!(m.normal_of_face_of_convex(cv, 3, &[0.0, 0.0]).is_err());
        assert!(m.normal_of_face_of_convex(cv, 0, &[0.0]).is_err());
        assert!(m.normal_of_face_of_convex_at(cv, 0, 2).is_err());
        assert!(matches!(
            m.normal_of_face_of_convex_at(ConvexId::new(4), 0, 0),
            Err(MeshError::NotFound { .. })
        ));
    }
}
