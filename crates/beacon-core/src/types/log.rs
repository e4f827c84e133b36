//! Console log entry type.

use serde::{Deserialize, Serialize};

/// A single console entry captured from the page.
///
/// Producers emit either `msg` or `message` for the text field; `msg` is
/// accepted as an alias on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogEntry {
    /// Console level: "error", "warn"/"warning", "info", "debug", "log".
    pub level: String,
    /// Message text.
    #[serde(alias = "msg")]
    pub message: String,
    /// Script source (typically `file:line`) that produced the entry.
    pub source: String,
}

impl LogEntry {
    /// Convenience constructor used by producers and tests.
    pub fn new(level: impl Into<String>, message: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            message: message.into(),
            source: source.into(),
        }
    }

    /// Whether the entry's level counts as an error.
    pub fn is_error(&self) -> bool {
        self.level == "error"
    }

    /// Whether the entry's level counts as a warning.
    pub fn is_warning(&self) -> bool {
        self.level == "warn" || self.level == "warning"
    }
}
