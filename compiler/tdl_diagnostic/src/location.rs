//! Source locations of graph-building calls.
//!
//! Forest scripts are ordinary Rust code, so the location of a bind or a
//! definition is the caller's location as reported by `#[track_caller]`.

use std::fmt;
use std::panic::Location;

/// A file/line/column position in the script that built the forest.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct SourceLoc {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl SourceLoc {
    /// Location used when no call site is known.
    pub const UNKNOWN: SourceLoc = SourceLoc {
        file: "<unknown>",
        line: 0,
        column: 0,
    };

    /// Create a location from its parts.
    pub const fn new(file: &'static str, line: u32, column: u32) -> Self {
        SourceLoc { file, line, column }
    }

    /// Location of the caller of the enclosing `#[track_caller]` function.
    #[track_caller]
    #[inline]
    pub fn caller() -> Self {
        Location::caller().into()
    }

    /// Check whether this is a real location.
    pub fn is_known(&self) -> bool {
        self.line != 0
    }
}

impl From<&'static Location<'static>> for SourceLoc {
    fn from(loc: &'static Location<'static>) -> Self {
        SourceLoc::new(loc.file(), loc.line(), loc.column())
    }
}

impl Default for SourceLoc {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
