//! Forest construction errors.
//!
//! Every failure of the graph engine is a [`ForestError`]. Errors that are
//! deferred instead of raised are stored as [`RecordedError`]s, which pair
//! the error with the script location that produced it.

use std::fmt;

use crate::{ErrorCode, SourceLoc};

/// An error raised while building or resolving a forest.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ForestError {
    /// An already-bound node was bound again with a different definition.
    #[error("node '{name}' redefined at {new} with different {what} (originally defined at {original})")]
    Redefined {
        name: String,
        what: &'static str,
        new: SourceLoc,
        original: SourceLoc,
    },

    /// A child was referenced but never bound by the time of resolution.
    #[error("node '{name}' is a child of '{parent}' but was never defined")]
    Uninitialized {
        name: String,
        parent: String,
        referenced_at: SourceLoc,
    },

    /// A node handle was used as a finished definition before being bound.
    #[error("node '{name}' used as a definition before it was bound")]
    Unbound { name: String },

    /// A child reference could not be resolved to a node.
    #[error("{message}")]
    Child { message: String },

    /// A definition is missing a mandatory field.
    #[error("invalid definition: {message}")]
    Definition { message: String },

    /// Supplementary location for the preceding error.
    #[error("{message} ({location})")]
    ExtraInfo {
        message: String,
        location: SourceLoc,
    },

    /// Many deferred errors reported at once.
    #[error("{} error(s) in forest definition", .0.len())]
    Aggregate(Vec<RecordedError>),

    /// The repository no longer accepts graph changes.
    #[error("repository already resolved; cannot {action}")]
    Closed { action: &'static str },
}

impl ForestError {
    /// Create a child error.
    pub fn child(message: impl Into<String>) -> Self {
        ForestError::Child {
            message: message.into(),
        }
    }

    /// Create a definition error.
    pub fn definition(message: impl Into<String>) -> Self {
        ForestError::Definition {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ForestError::Redefined { .. } => ErrorCode::T0001,
            ForestError::Uninitialized { .. } => ErrorCode::T0002,
            ForestError::Unbound { .. } => ErrorCode::T0003,
            ForestError::Child { .. } => ErrorCode::T0004,
            ForestError::Definition { .. } => ErrorCode::T0005,
            ForestError::ExtraInfo { .. } => ErrorCode::T0006,
            ForestError::Aggregate(_) => ErrorCode::T0007,
            ForestError::Closed { .. } => ErrorCode::T0008,
        }
    }

    /// The note that should follow this error when it is recorded.
    pub fn extra_info(&self) -> Option<ForestError> {
        match self {
            ForestError::Redefined { original, .. } if original.is_known() => {
                Some(ForestError::ExtraInfo {
                    message: "node originally defined here".to_owned(),
                    location: *original,
                })
            }
            ForestError::Uninitialized { referenced_at, .. } if referenced_at.is_known() => {
                Some(ForestError::ExtraInfo {
                    message: "child referenced here".to_owned(),
                    location: *referenced_at,
                })
            }
            _ => None,
        }
    }

    /// Deferred errors carried by an aggregate, if this is one.
    pub fn errors(&self) -> &[RecordedError] {
        match self {
            ForestError::Aggregate(errors) => errors,
            _ => &[],
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, ForestError::Aggregate(_))
    }
}

/// A deferred error together with the script location it was recorded for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedError {
    pub error: ForestError,
    pub location: SourceLoc,
}

impl RecordedError {
    pub fn new(error: ForestError, location: SourceLoc) -> Self {
        RecordedError { error, location }
    }

    pub fn code(&self) -> ErrorCode {
        self.error.code()
    }
}

impl fmt::Display for RecordedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] {}", self.location, self.code(), self.error)
    }
}
