#![cfg_attr(docsrs, feature(doc_cfg))]
//! # fem-mesh
//!
//! fem-mesh is the mesh management kernel of a finite-element library. A
//! [`Mesh`](mesh::Mesh) stores points and convexes under sparse, stable
//! integer ids, groups convexes and convex faces into numbered regions, and
//! tells subscribed objects about every structural change so they can keep
//! their own per-convex data aligned.
//!
//! ## Features
//! - Points merged within a tolerance, convexes deduplicated by point list
//! - Simplex, parallelepiped and prism elements of degree one, any dimension
//! - Regions of whole convexes or convex faces, with an "all convexes" form
//! - Lazily cached derived data: Cuthill–McKee order, MPI and thread regions
//! - Geometric queries: Jacobians, face normals, quality and radius estimates
//! - A plain-text mesh format that round-trips exactly
//!
//! ## Usage
//! ```
//! use fem_mesh::prelude::*;
//!
//! let mut mesh = Mesh::new();
//! let a = mesh.add_triangle_by_points(&[0.0, 0.0], &[1.0, 0.0], &[0.0, 1.0])?;
//! let b = mesh.add_triangle_by_points(&[1.0, 0.0], &[1.0, 1.0], &[0.0, 1.0])?;
//! assert_eq!(mesh.nb_points(), 4);
//! assert_eq!(mesh.neighbours_of_convex(a, 0)?, vec![b]);
//! # Ok::<(), MeshError>(())
//! ```
//!
//! ## Optional features
//! - `rayon`: parallel quality estimates and a rayon-sized thread split
//! - `mpi-support`: an MPI communicator for rank-local regions
//! - `metis-support`: a METIS-backed partitioner
//! - `check-invariants`: full consistency checks after bulk operations in
//!   release builds

pub mod algs;
pub mod debug_invariants;
pub mod geometry;
pub mod io;
pub mod mesh;
pub mod mesh_error;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// The most-used types and traits.
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, NoComm, StaticComm};
    pub use crate::algs::extrude::extrude;
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::partition::{ChunkPartitioner, GraphPartitioner};
    pub use crate::algs::threads::{FixedThreads, SingleThread, ThreadDistribution};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::geometry::precomposite::MeshPrecomposite;
    pub use crate::geometry::transform::GeometricTransformation;
    pub use crate::io::MeshTextFormat;
    pub use crate::mesh::{Mesh, MeshConfig};
    pub use crate::mesh_error::MeshError;
    pub use crate::topology::convex_structure::ConvexStructure;
    pub use crate::topology::notify::{ContextDependent, MeshMessage, MeshReceiver};
    pub use crate::topology::point::{ConvexId, FaceId, PointId, RegionId};
    pub use crate::topology::region::MeshRegion;
}
