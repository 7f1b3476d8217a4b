//! Identifiers, reference shapes and the bookkeeping types shared by the
//! mesh: sparse index tables, regions, change notification and caches.

pub mod cache;
pub mod convex_structure;
pub mod index_table;
pub mod notify;
pub mod point;
pub mod region;

pub use cache::InvalidateCache;
pub use convex_structure::ConvexStructure;
pub use index_table::{BitVector, IndexTable};
pub use notify::{ContextDependent, MeshMessage, MeshReceiver};
pub use point::{ConvexId, FaceId, PointId, RegionId};
pub use region::{FaceMask, MeshRegion, RegionTable};
