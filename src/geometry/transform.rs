//! Degree-one geometric transformations.
//!
//! A [`GeometricTransformation`] maps its reference convex onto a real
//! convex through Lagrange shape functions attached to the reference nodes:
//! `x(ξ) = Σ_k X_k φ_k(ξ)`. The Jacobian `K = ∂x/∂ξ` is an `N × P` matrix,
//! `N` the mesh dimension and `P` the reference dimension.
//!
//! Names follow the usual FE catalogue: `GT_PK(d,1)` for simplices,
//! `GT_QK(d,1)` for parallelepipeds and `GT_PRISM(d,1)` for prisms.

use std::fmt;

use nalgebra::{DMatrix, DVector};

use crate::mesh_error::MeshError;
use crate::topology::convex_structure::ConvexStructure;

/// Geometric transformation attached to a convex.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeometricTransformation {
    structure: ConvexStructure,
}

impl GeometricTransformation {
    /// Wraps a reference shape with its degree-one transformation.
    pub fn new(structure: ConvexStructure) -> Result<Self, MeshError> {
        Ok(Self {
            structure: structure.validate()?,
        })
    }

    pub fn simplex(dim: usize) -> Result<Self, MeshError> {
        Self::new(ConvexStructure::Simplex(narrow(dim)?))
    }

    pub fn parallelepiped(dim: usize) -> Result<Self, MeshError> {
        Self::new(ConvexStructure::Parallelepiped(narrow(dim)?))
    }

    pub fn prism(dim: usize) -> Result<Self, MeshError> {
        Self::new(ConvexStructure::Prism(narrow(dim)?))
    }

    #[inline]
    pub fn structure(&self) -> ConvexStructure {
        self.structure
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.structure.dim()
    }

    #[inline]
    pub fn nb_points(&self) -> usize {
        self.structure.nb_points()
    }

    /// Whether `K` is constant over the convex.
    pub fn is_linear(&self) -> bool {
        matches!(self.structure, ConvexStructure::Simplex(_))
            || self.structure == ConvexStructure::Parallelepiped(1)
    }

    /// Shape function values at reference point `xi`.
    pub fn values(&self, xi: &[f64]) -> Vec<f64> {
        shape_values(self.structure, xi)
    }

    /// Shape function gradients at `xi`: an `nb_points × P` matrix.
    pub fn gradients(&self, xi: &[f64]) -> DMatrix<f64> {
        let nb = self.nb_points();
        let p = self.dim();
        let mut g = DMatrix::zeros(nb, p);
        for k in 0..nb {
            let grad = shape_gradient(self.structure, k, xi);
            for j in 0..p {
                g[(k, j)] = grad[j];
            }
        }
        g
    }

    /// Real coordinates of reference point `xi`, given the node matrix
    /// `nodes` (`N × nb_points`, one column per node).
    pub fn transform(&self, xi: &[f64], nodes: &DMatrix<f64>) -> DVector<f64> {
        nodes * DVector::from_vec(self.values(xi))
    }

    /// Canonical name, e.g. `GT_PK(2,1)`.
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// Parses a canonical name.
    pub fn parse(name: &str) -> Result<Self, MeshError> {
        let bad = || MeshError::PreconditionViolation(format!("unknown transformation {name}"));
        let name = name.trim().trim_matches('\'');
        let open = name.find('(').ok_or_else(bad)?;
        let args = name[open..]
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(bad)?;
        let mut parts = args.split(',').map(str::trim);
        let dim = parts
            .next()
            .and_then(|d| d.parse::<usize>().ok())
            .ok_or_else(bad)?;
        let degree = parts
            .next()
            .and_then(|d| d.parse::<usize>().ok())
            .ok_or_else(bad)?;
        if parts.next().is_some() || degree != 1 {
            return Err(bad());
        }
        match &name[..open] {
            "GT_PK" => Self::simplex(dim),
            "GT_QK" => Self::parallelepiped(dim),
            "GT_PRISM" => Self::prism(dim),
            _ => Err(bad()),
        }
    }
}

impl fmt::Display for GeometricTransformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let family = match self.structure {
            ConvexStructure::Simplex(_) => "GT_PK",
            ConvexStructure::Parallelepiped(_) => "GT_QK",
            ConvexStructure::Prism(_) => "GT_PRISM",
        };
        write!(f, "{family}({},1)", self.dim())
    }
}

/// Shape gradients of a transformation at each of its reference nodes.
///
/// Shared by every convex using the transformation; queries "at node `n`"
/// read from here instead of re-evaluating the shape functions.
#[derive(Clone, Debug)]
pub struct GeoTransPrecomp {
    gt: GeometricTransformation,
    nodes: Vec<Vec<f64>>,
    grads: Vec<DMatrix<f64>>,
}

impl GeoTransPrecomp {
    pub fn new(gt: GeometricTransformation) -> Self {
        let nodes = gt.structure().nodes();
        let grads = nodes.iter().map(|x| gt.gradients(x)).collect();
        Self { gt, nodes, grads }
    }

    pub fn trans(&self) -> GeometricTransformation {
        self.gt
    }

    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, n: usize) -> Option<&[f64]> {
        self.nodes.get(n).map(Vec::as_slice)
    }

    pub fn gradients(&self, n: usize) -> Option<&DMatrix<f64>> {
        self.grads.get(n)
    }
}

fn narrow(dim: usize) -> Result<u8, MeshError> {
    u8::try_from(dim)
        .map_err(|_| MeshError::PreconditionViolation(format!("dimension {dim} too large")))
}

fn shape_values(s: ConvexStructure, xi: &[f64]) -> Vec<f64> {
    let d = s.dim();
    match s {
        ConvexStructure::Simplex(_) => {
            let mut v = Vec::with_capacity(d + 1);
            v.push(1.0 - xi[..d].iter().sum::<f64>());
            v.extend_from_slice(&xi[..d]);
            v
        }
        ConvexStructure::Parallelepiped(_) => (0..s.nb_points())
            .map(|k| {
                (0..d)
                    .map(|j| if (k >> j) & 1 == 1 { xi[j] } else { 1.0 - xi[j] })
                    .product()
            })
            .collect(),
        ConvexStructure::Prism(_) => {
            let base = shape_values(ConvexStructure::Simplex((d - 1) as u8), &xi[..d - 1]);
            let t = xi[d - 1];
            base.iter()
                .map(|l| l * (1.0 - t))
                .chain(base.iter().map(|l| l * t))
                .collect()
        }
    }
}

fn shape_gradient(s: ConvexStructure, k: usize, xi: &[f64]) -> Vec<f64> {
    let d = s.dim();
    match s {
        ConvexStructure::Simplex(_) => {
            if k == 0 {
                vec![-1.0; d]
            } else {
                let mut g = vec![0.0; d];
                g[k - 1] = 1.0;
                g
            }
        }
        ConvexStructure::Parallelepiped(_) => {
            let factor = |j: usize| if (k >> j) & 1 == 1 { xi[j] } else { 1.0 - xi[j] };
            (0..d)
                .map(|j| {
                    let sign = if (k >> j) & 1 == 1 { 1.0 } else { -1.0 };
                    sign * (0..d).filter(|&l| l != j).map(&factor).product::<f64>()
                })
                .collect()
        }
        ConvexStructure::Prism(_) => {
            let base = ConvexStructure::Simplex((d - 1) as u8);
            let nb = base.nb_points();
            let (i, top) = (k % nb, k >= nb);
            let t = xi[d - 1];
            let lambda = shape_values(base, &xi[..d - 1])[i];
            let tfac = if top { t } else { 1.0 - t };
            let mut g: Vec<f64> = shape_gradient(base, i, &xi[..d - 1])
                .into_iter()
                .map(|x| x * tfac)
                .collect();
            g.push(if top { lambda } else { -lambda });
            g
        }
    }
}
