//! Consistency checks of the mesh bookkeeping.
//!
//! [`DebugInvariants::validate_invariants`] walks a structure and reports the
//! first broken invariant. Bulk operations (`optimize_structure`, loading a
//! file) run it through [`debug_invariants!`](crate::debug_invariants) in
//! debug builds, or in release builds with the `check-invariants` feature.

use crate::mesh_error::MeshError;

/// Structures able to check their own invariants.
pub trait DebugInvariants {
    /// Returns the first broken invariant as an
    /// [`MeshError::InternalConsistencyFault`].
    fn validate_invariants(&self) -> Result<(), MeshError>;

    /// Panics on a broken invariant when checking is enabled; no-op otherwise.
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "validate_invariants");
    }
}

/// Runs a fallible check and panics with `ctx` on error, in debug builds or
/// with the `check-invariants` feature.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
