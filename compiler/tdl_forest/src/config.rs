//! Engine configuration.
//!
//! Environment variables (read by [`ForestConfig::from_env`]):
//! - `TDL_PRUNE_ORPHANS`: delete parentless nodes outside the root group on resolve
//! - `TDL_INTERACTIVE`: raise bind errors immediately instead of deferring them
//! - `TDL_ERROR_LIMIT`: deferred errors tolerated before construction aborts (0 = unlimited)

use tdl_diagnostic::DEFAULT_ERROR_LIMIT;

/// How bind errors are reported.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ConstructionMode {
    /// Every error is returned to the caller at once.
    Interactive,
    /// Errors are recorded and construction continues best-effort.
    #[default]
    Batch,
}

/// Configuration shared by all scopes of one repository.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ForestConfig {
    /// Delete parentless nodes that are not in the root group on resolve.
    pub prune_orphans: bool,
    pub mode: ConstructionMode,
    /// Maximum deferred errors before aborting (0 = unlimited).
    pub error_limit: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        ForestConfig {
            prune_orphans: false,
            mode: ConstructionMode::Batch,
            error_limit: DEFAULT_ERROR_LIMIT,
        }
    }
}

impl ForestConfig {
    /// Immediate errors, for tests and interactive sessions.
    pub fn interactive() -> Self {
        ForestConfig {
            mode: ConstructionMode::Interactive,
            ..Self::default()
        }
    }

    /// Deferred errors with the default limit.
    pub fn batch() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_prune_orphans(mut self, prune: bool) -> Self {
        self.prune_orphans = prune;
        self
    }

    #[must_use]
    pub fn with_error_limit(mut self, limit: usize) -> Self {
        self.error_limit = limit;
        self
    }

    /// Defaults overridden by the `TDL_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `TDL_*` keys.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(prune) = read_flag(&lookup, "TDL_PRUNE_ORPHANS") {
            config.prune_orphans = prune;
        }
        if let Some(interactive) = read_flag(&lookup, "TDL_INTERACTIVE") {
            config.mode = if interactive {
                ConstructionMode::Interactive
            } else {
                ConstructionMode::Batch
            };
        }
        if let Some(raw) = lookup("TDL_ERROR_LIMIT") {
            match raw.trim().parse() {
                Ok(limit) => config.error_limit = limit,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid TDL_ERROR_LIMIT"),
            }
        }
        config
    }
}

fn read_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    let raw = lookup(key)?;
    let flag = parse_flag(&raw);
    if flag.is_none() {
        tracing::warn!(key, value = %raw, "ignoring invalid boolean setting");
    }
    flag
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
