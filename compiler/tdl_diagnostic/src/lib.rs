//! Error reporting for the TDL forest engine.
//!
//! - Error codes for searchability
//! - One error enum covering every failure of graph construction
//! - Source locations captured from the building script
//! - A capped queue for errors deferred during best-effort construction

mod error;
mod error_code;
mod location;
pub mod queue;

pub use error::{ForestError, RecordedError};
pub use error_code::ErrorCode;
pub use location::SourceLoc;
pub use queue::{ErrorQueue, QueueStatus, DEFAULT_ERROR_LIMIT};
