//! MeshError: Unified error type for fem-mesh public APIs
//!
//! Every fallible operation of the mesh kernel returns this type. The first
//! two variants are recoverable (the failed call had no effect); an
//! `InternalConsistencyFault` means a collaborator broke an invariant and the
//! mutating call was abandoned.

use thiserror::Error;

/// Unified error type for mesh operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// The operation referenced an id that is not live.
    #[error("{what} {id} does not exist")]
    NotFound { what: &'static str, id: usize },
    /// A precondition of the call does not hold (e.g. the point is still used).
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),
    /// An invariant of the mesh or of a collaborator was found broken.
    #[error("internal consistency fault: {0}")]
    InternalConsistencyFault(String),
    /// Malformed mesh text stream.
    #[error("mesh file format error at line {line}: {msg}")]
    IoFormat { line: usize, msg: String },
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(String),
}

impl MeshError {
    pub(crate) fn point_not_found(id: usize) -> Self {
        MeshError::NotFound { what: "point", id }
    }

    pub(crate) fn convex_not_found(id: usize) -> Self {
        MeshError::NotFound { what: "convex", id }
    }

    pub(crate) fn format(line: usize, msg: impl Into<String>) -> Self {
        MeshError::IoFormat {
            line,
            msg: msg.into(),
        }
    }
}

impl From<std::io::Error> for MeshError {
    fn from(e: std::io::Error) -> Self {
        MeshError::Io(e.to_string())
    }
}
