//! Bounding box and bulk coordinate transforms.

use nalgebra::{DMatrix, DVector};

use crate::mesh::Mesh;
use crate::mesh_error::MeshError;

impl Mesh {
    /// Componentwise `(min, max)` over the live points, `None` when empty.
    pub fn bounding_box(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        let mut it = self.point_ids().filter_map(|p| self.point(p));
        let first = it.next()?;
        let (mut lo, mut hi) = (first.to_vec(), first.to_vec());
        for x in it {
            for (j, &xj) in x.iter().enumerate() {
                lo[j] = lo[j].min(xj);
                hi[j] = hi[j].max(xj);
            }
        }
        Some((lo, hi))
    }

    /// Adds `v` to every point.
    pub fn translation(&mut self, v: &[f64]) -> Result<(), MeshError> {
        self.check_ambient(v.len(), "translation vector")?;
        self.points.map_coords(|x| {
            for (xi, vi) in x.iter_mut().zip(v) {
                *xi += vi;
            }
        });
        self.touch();
        Ok(())
    }

    /// Replaces every point `x` by `a · x`; `a` must be `d × d`.
    ///
    /// Points are moved, never merged: a singular or contracting `a` can
    /// leave two live points within `eps` of each other. They keep their
    /// ids and [`search_point`](Self::search_point) reports the lower one.
    pub fn transformation(&mut self, a: &DMatrix<f64>) -> Result<(), MeshError> {
        if a.nrows() != a.ncols() {
            return Err(MeshError::PreconditionViolation(format!(
                "transformation matrix is {}x{}, not square",
                a.nrows(),
                a.ncols()
            )));
        }
        self.check_ambient(a.ncols(), "transformation matrix")?;
        if a.nrows() > 0 && a.singular_values().min() <= f64::EPSILON * a.norm() {
            log::warn!(
                "singular transformation of mesh {}: distinct points may coincide",
                self.uid()
            );
        }
        self.points.map_coords(|x| {
            let y = a * DVector::from_column_slice(x);
            x.copy_from_slice(y.as_slice());
        });
        self.touch();
        Ok(())
    }

    fn check_ambient(&self, n: usize, what: &str) -> Result<(), MeshError> {
        match self.dim() {
            Some(d) if d != n => Err(MeshError::PreconditionViolation(format!(
                "{what} of dimension {n} for a mesh of dimension {d}"
            ))),
            _ => Ok(()),
        }
    }
}
