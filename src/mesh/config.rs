//! Construction-time settings of a [`Mesh`](crate::mesh::Mesh).

use serde::{Deserialize, Serialize};

/// Default merge tolerance, infinity norm.
pub const DEFAULT_EPS: f64 = 1e-10;

/// Mesh configuration.
///
/// ```
/// use fem_mesh::mesh::MeshConfig;
/// let cfg: MeshConfig = serde_json::from_str(r#"{ "dim": 3 }"#).unwrap();
/// assert_eq!(cfg.dim, Some(3));
/// assert!(cfg.merge_points);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Ambient dimension; fixed by the first inserted point when `None`.
    pub dim: Option<usize>,
    /// Two points closer than this (infinity norm) are the same point.
    pub eps: f64,
    /// Whether `add_point` and the `*_by_points` constructors merge.
    pub merge_points: bool,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            dim: None,
            eps: DEFAULT_EPS,
            merge_points: true,
        }
    }
}

impl MeshConfig {
    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = Some(dim);
        self
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Every inserted point gets a fresh id.
    pub fn without_merging(mut self) -> Self {
        self.merge_points = false;
        self
    }
}
