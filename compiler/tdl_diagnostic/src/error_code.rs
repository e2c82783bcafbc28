use std::fmt;

/// Error codes for all forest construction diagnostics.
///
/// Format: T#### where the code identifies one error kind:
/// - T0001..T0005: primary errors raised while building the graph
/// - T0006: supplementary notes attached to a primary error
/// - T0007..T0008: errors about the repository as a whole
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    /// Node bound again with a different definition
    T0001,
    /// Child referenced but never defined
    T0002,
    /// Node used as a definition before being bound
    T0003,
    /// Child reference could not be resolved
    T0004,
    /// Definition missing mandatory fields
    T0005,
    /// Supplementary location for a previous error
    T0006,
    /// Collection of deferred errors
    T0007,
    /// Repository already resolved
    T0008,
}

impl ErrorCode {
    /// All error codes, in numeric order.
    pub const ALL: [ErrorCode; 8] = [
        ErrorCode::T0001,
        ErrorCode::T0002,
        ErrorCode::T0003,
        ErrorCode::T0004,
        ErrorCode::T0005,
        ErrorCode::T0006,
        ErrorCode::T0007,
        ErrorCode::T0008,
    ];

    /// Get the string representation of this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::T0001 => "T0001",
            ErrorCode::T0002 => "T0002",
            ErrorCode::T0003 => "T0003",
            ErrorCode::T0004 => "T0004",
            ErrorCode::T0005 => "T0005",
            ErrorCode::T0006 => "T0006",
            ErrorCode::T0007 => "T0007",
            ErrorCode::T0008 => "T0008",
        }
    }

    /// One-line description for `explain`-style reporting.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::T0001 => "node redefined with a different definition",
            ErrorCode::T0002 => "child node referenced but never defined",
            ErrorCode::T0003 => "node used as a definition before it was bound",
            ErrorCode::T0004 => "child reference could not be resolved to a node",
            ErrorCode::T0005 => "definition is missing a mandatory field",
            ErrorCode::T0006 => "additional location for the previous error",
            ErrorCode::T0007 => "multiple errors in forest definition",
            ErrorCode::T0008 => "repository already resolved",
        }
    }

    /// Parse an error code from its string form (`"T0004"`).
    pub fn parse(s: &str) -> Option<ErrorCode> {
        ErrorCode::ALL.into_iter().find(|code| code.as_str() == s)
    }

    /// Supplementary notes do not count toward the error limit.
    pub fn is_note(&self) -> bool {
        matches!(self, ErrorCode::T0006)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
