//! Geometry of a mesh: point storage, geometric transformations and the
//! per-convex queries built on them (Jacobians, face normals, quality).

pub mod affine;
pub mod face;
pub mod jacobian;
pub mod point_store;
pub mod precomposite;
pub mod quality;
pub mod transform;

pub use point_store::{PointRecord, PointStore};
pub use precomposite::MeshPrecomposite;
pub use transform::{GeoTransPrecomp, GeometricTransformation};
