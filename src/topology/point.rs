//! Strong, zero-cost handles for mesh points, convexes and convex faces.
//!
//! Point and convex ids are small dense integers handed out by an
//! [`IndexTable`](crate::topology::index_table::IndexTable). An id stays
//! attached to the same entity while it is live; removal leaves a hole and
//! only [`Mesh::optimize_structure`](crate::mesh::Mesh::optimize_structure)
//! renumbers.
//!
//! # Memory layout
//! Both id types are `repr(transparent)` over `usize`, so slices of ids can
//! be handed to partitioners and MPI as plain integers.

use std::fmt;

macro_rules! dense_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[repr(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Wraps a raw index.
            #[inline]
            pub const fn new(raw: usize) -> Self {
                $name(raw)
            }

            /// Returns the raw index.
            #[inline]
            pub const fn get(self) -> usize {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for usize {
            #[inline]
            fn from(id: $name) -> usize {
                id.0
            }
        }

        #[cfg(feature = "mpi-support")]
        unsafe impl mpi::datatype::Equivalence for $name {
            type Out = <usize as mpi::datatype::Equivalence>::Out;

            fn equivalent_datatype() -> Self::Out {
                usize::equivalent_datatype()
            }
        }
    };
}

dense_id!(
    /// Handle of a geometric point (mesh node).
    PointId
);
dense_id!(
    /// Handle of a convex (mesh element).
    ConvexId
);

/// User-chosen region number.
pub type RegionId = usize;

/// Largest number of faces a convex may expose to regions.
pub const MAX_FACES: u16 = 63;

/// A local face of a convex, or [`FaceId::WHOLE`] for the convex itself.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[repr(transparent)]
pub struct FaceId(u16);

impl FaceId {
    /// Sentinel for "the whole convex".
    pub const WHOLE: FaceId = FaceId(u16::MAX);

    /// Local face `f` of a convex.
    ///
    /// # Panics
    /// Panics if `f >= MAX_FACES`.
    #[inline]
    pub const fn face(f: u16) -> Self {
        assert!(f < MAX_FACES, "face number out of range");
        FaceId(f)
    }

    /// Checked constructor.
    #[inline]
    pub fn try_face(f: usize) -> Option<Self> {
        (f < MAX_FACES as usize).then(|| FaceId(f as u16))
    }

    #[inline]
    pub const fn is_whole(self) -> bool {
        self.0 == u16::MAX
    }

    /// Local face number, or `None` for the whole convex.
    #[inline]
    pub const fn local(self) -> Option<usize> {
        if self.is_whole() {
            None
        } else {
            Some(self.0 as usize)
        }
    }
}

impl fmt::Debug for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.local() {
            Some(face) => f.debug_tuple("FaceId").field(&face).finish(),
            None => f.write_str("FaceId::WHOLE"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display() {
        let p = PointId::new(7);
        assert_eq!(format!("{:?}", p), "PointId(7)");
        assert_eq!(format!("{}", p), "7");
        assert_eq!(format!("{:?}", ConvexId::new(3)), "ConvexId(3)");
    }

    #[test]
    fn face_sentinel() {
        assert!(FaceId::WHOLE.is_whole());
        assert_eq!(FaceId::WHOLE.local(), None);
        assert_eq!(FaceId::face(2).local(), Some(2));
        assert!(FaceId::try_face(63).is_none());
        assert!(FaceId::face(0) < FaceId::WHOLE);
    }

    #[test]
    fn json_roundtrip() {
        let c = ConvexId::new(123);
        let s = serde_json::to_string(&c).unwrap();
        let c2: ConvexId = serde_json::from_str(&s).unwrap();
        assert_eq!(c2, c);
    }
}
