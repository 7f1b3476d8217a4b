//! Graph algorithms over the convex dual graph, extrusion, and the parallel
//! collaborators a mesh is configured with.

pub mod communicator;
pub mod cuthill_mckee;
pub mod dual_graph;
pub mod extrude;
pub mod metis_partition;
pub mod partition;
pub mod threads;

pub use communicator::{Communicator, NoComm, StaticComm};
pub use cuthill_mckee::cuthill_mckee;
pub use dual_graph::{DualGraph, build_face_dual};
pub use extrude::extrude;
pub use partition::{ChunkPartitioner, GraphPartitioner};
pub use threads::{FixedThreads, SingleThread, ThreadDistribution};
