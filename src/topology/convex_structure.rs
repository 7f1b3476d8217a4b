//! Reference shapes of mesh convexes.
//!
//! A [`ConvexStructure`] fixes the topology of a convex: its dimension, the
//! number and ordering of its nodes, and its faces. Three families are
//! supported in any dimension:
//!
//! - **Simplex(d)**: nodes `0, e1, …, ed`. Face `0` is opposite node `0`
//!   (the slanted face `Σx = 1`); face `i ≥ 1` is `x_{i-1} = 0`.
//! - **Parallelepiped(d)**: `2^d` nodes, node `k` has `x_j = bit j of k`.
//!   Face `2j` is `x_j = 1`, face `2j + 1` is `x_j = 0`.
//! - **Prism(d)**: `Simplex(d-1) × [0, 1]`, the bottom simplex nodes first.
//!   Faces `0..d` are the lateral faces (one per face of the base simplex),
//!   face `d` is the top `t = 1`, face `d + 1` the bottom `t = 0`.
//!
//! Every face is described by an outward unit normal `n` and an offset `c`
//! so that the face lies in `n·x = c` and the reference convex is
//! `{ x : n_f·x ≤ c_f for all f }`.

use crate::mesh_error::MeshError;

const ON_FACE_TOL: f64 = 1e-10;

/// Reference shape of a convex.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ConvexStructure {
    /// Generic simplex of dimension `d` (segment, triangle, tetrahedron, …).
    Simplex(u8),
    /// Generic parallelepiped of dimension `d` (segment, quad, hexahedron, …).
    Parallelepiped(u8),
    /// Generic prism of dimension `d ≥ 2`.
    Prism(u8),
}

impl ConvexStructure {
    /// Segment (1D simplex).
    pub const SEGMENT: ConvexStructure = ConvexStructure::Simplex(1);
    /// Triangle.
    pub const TRIANGLE: ConvexStructure = ConvexStructure::Simplex(2);
    /// Tetrahedron.
    pub const TETRAHEDRON: ConvexStructure = ConvexStructure::Simplex(3);
    /// Quadrilateral.
    pub const QUADRILATERAL: ConvexStructure = ConvexStructure::Parallelepiped(2);
    /// Hexahedron.
    pub const HEXAHEDRON: ConvexStructure = ConvexStructure::Parallelepiped(3);
    /// 3D wedge.
    pub const WEDGE: ConvexStructure = ConvexStructure::Prism(3);

    /// Checks the dimension is supported.
    pub fn validate(self) -> Result<Self, MeshError> {
        let ok = match self {
            ConvexStructure::Simplex(d) => (1..=16).contains(&d),
            ConvexStructure::Parallelepiped(d) => (1..=6).contains(&d),
            ConvexStructure::Prism(d) => (2..=16).contains(&d),
        };
        if ok {
            Ok(self)
        } else {
            Err(MeshError::PreconditionViolation(format!(
                "unsupported reference shape {self:?}"
            )))
        }
    }

    /// Topological dimension.
    pub fn dim(self) -> usize {
        match self {
            ConvexStructure::Simplex(d)
            | ConvexStructure::Parallelepiped(d)
            | ConvexStructure::Prism(d) => d as usize,
        }
    }

    /// Number of nodes.
    pub fn nb_points(self) -> usize {
        let d = self.dim();
        match self {
            ConvexStructure::Simplex(_) => d + 1,
            ConvexStructure::Parallelepiped(_) => 1 << d,
            ConvexStructure::Prism(_) => 2 * d,
        }
    }

    /// Number of faces.
    pub fn nb_faces(self) -> usize {
        let d = self.dim();
        match self {
            ConvexStructure::Simplex(_) => d + 1,
            ConvexStructure::Parallelepiped(_) => 2 * d,
            ConvexStructure::Prism(_) => d + 2,
        }
    }

    /// Coordinates of node `i` in the reference convex.
    pub fn node(self, i: usize) -> Vec<f64> {
        let d = self.dim();
        match self {
            ConvexStructure::Simplex(_) => {
                let mut x = vec![0.0; d];
                if i > 0 {
                    x[i - 1] = 1.0;
                }
                x
            }
            ConvexStructure::Parallelepiped(_) => {
                (0..d).map(|j| ((i >> j) & 1) as f64).collect()
            }
            ConvexStructure::Prism(_) => {
                let base = ConvexStructure::Simplex((d - 1) as u8);
                let nb = base.nb_points();
                let mut x = base.node(i % nb);
                x.push((i / nb) as f64);
                x
            }
        }
    }

    /// All reference nodes, in node order.
    pub fn nodes(self) -> Vec<Vec<f64>> {
        (0..self.nb_points()).map(|i| self.node(i)).collect()
    }

    /// Outward unit normal and offset of face `f`.
    pub fn face_plane(self, f: usize) -> (Vec<f64>, f64) {
        let d = self.dim();
        match self {
            ConvexStructure::Simplex(_) => {
                if f == 0 {
                    let s = 1.0 / (d as f64).sqrt();
                    (vec![s; d], s)
                } else {
                    let mut n = vec![0.0; d];
                    n[f - 1] = -1.0;
                    (n, 0.0)
                }
            }
            ConvexStructure::Parallelepiped(_) => {
                let mut n = vec![0.0; d];
                let j = f / 2;
                if f % 2 == 0 {
                    n[j] = 1.0;
                    (n, 1.0)
                } else {
                    n[j] = -1.0;
                    (n, 0.0)
                }
            }
            ConvexStructure::Prism(_) => {
                if f < d {
                    let base = ConvexStructure::Simplex((d - 1) as u8);
                    let (mut n, c) = base.face_plane(f);
                    n.push(0.0);
                    (n, c)
                } else {
                    let mut n = vec![0.0; d];
                    if f == d {
                        n[d - 1] = 1.0;
                        (n, 1.0)
                    } else {
                        n[d - 1] = -1.0;
                        (n, 0.0)
                    }
                }
            }
        }
    }

    /// Reference outward unit normal of face `f`.
    pub fn face_normal(self, f: usize) -> Vec<f64> {
        self.face_plane(f).0
    }

    /// Local node numbers lying on face `f`, ascending.
    pub fn ind_points_of_face(self, f: usize) -> Vec<usize> {
        let (n, c) = self.face_plane(f);
        (0..self.nb_points())
            .filter(|&i| (dot(&n, &self.node(i)) - c).abs() < ON_FACE_TOL)
            .collect()
    }

    /// Signed distance-like measure of `x` to the reference convex:
    /// `≤ 0` inside, `> 0` outside.
    pub fn is_in(self, x: &[f64]) -> f64 {
        (0..self.nb_faces())
            .map(|f| {
                let (n, c) = self.face_plane(f);
                dot(&n, x) - c
            })
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Barycenter of the reference nodes.
    pub fn centroid(self) -> Vec<f64> {
        let nodes = self.nodes();
        let inv = 1.0 / nodes.len() as f64;
        let mut c = vec![0.0; self.dim()];
        for x in &nodes {
            for (ci, xi) in c.iter_mut().zip(x) {
                *ci += xi * inv;
            }
        }
        c
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
