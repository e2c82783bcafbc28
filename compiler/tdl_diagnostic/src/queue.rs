//! Deferred error queue.
//!
//! Collects errors recorded during best-effort graph construction:
//! - Primary errors count toward a hard limit
//! - Supplementary notes ride along with the error they annotate
//! - Overflow is reported to the caller, who turns it into an aggregate error

use crate::{ForestError, RecordedError, SourceLoc};

/// Default number of primary errors tolerated before construction aborts.
pub const DEFAULT_ERROR_LIMIT: usize = 100;

/// Outcome of recording an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QueueStatus {
    /// The error was stored and construction may continue.
    Accepted,
    /// The error was stored and the limit is now exceeded.
    Overflow,
}

/// Queue of deferred errors with a primary-error limit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorQueue {
    errors: Vec<RecordedError>,
    /// Count of primary errors (notes excluded).
    primary_count: usize,
    /// Maximum primary errors before overflow (0 = unlimited).
    limit: usize,
}

impl Default for ErrorQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorQueue {
    /// Create a queue with the default limit.
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_ERROR_LIMIT)
    }

    /// Create a queue with a custom limit (0 = unlimited).
    pub fn with_limit(limit: usize) -> Self {
        ErrorQueue {
            errors: Vec::new(),
            primary_count: 0,
            limit,
        }
    }

    /// Record an error, followed by its supplementary note if it has one.
    pub fn push(&mut self, error: ForestError, location: SourceLoc) -> QueueStatus {
        let note = error.extra_info();
        if !error.code().is_note() {
            self.primary_count += 1;
        }
        self.errors.push(RecordedError::new(error, location));
        if let Some(note) = note {
            self.errors.push(RecordedError::new(note, location));
        }
        if self.limit_exceeded() {
            QueueStatus::Overflow
        } else {
            QueueStatus::Accepted
        }
    }

    /// Check whether more primary errors than the limit were recorded.
    pub fn limit_exceeded(&self) -> bool {
        self.limit > 0 && self.primary_count > self.limit
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Total number of recorded entries, notes included.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of primary errors.
    pub fn primary_count(&self) -> usize {
        self.primary_count
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordedError> {
        self.errors.iter()
    }

    pub fn as_slice(&self) -> &[RecordedError] {
        &self.errors
    }

    /// Snapshot of the queue as an aggregate error.
    pub fn to_aggregate(&self) -> ForestError {
        ForestError::Aggregate(self.errors.clone())
    }
}
