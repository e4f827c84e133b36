//! Engine-wide caps and thresholds.

use std::time::Duration;

/// Maximum number of named checkpoints retained; oldest evicted beyond this.
pub const MAX_NAMED_CHECKPOINTS: usize = 20;

/// Maximum length of a checkpoint name.
pub const MAX_CHECKPOINT_NAME_LEN: usize = 50;

/// Per-category entry cap in a single diff response.
pub const MAX_DIFF_ENTRIES_PER_CATEGORY: usize = 50;

/// Console messages are truncated to this many bytes (on a UTF-8 boundary).
pub const MAX_MESSAGE_LEN: usize = 200;

/// A known endpoint slower than `baseline * factor` counts as degraded.
pub const DEGRADED_LATENCY_FACTOR: f64 = 3.0;

/// Total rule cap across built-in, user, dismissed, and auto-detected rules.
pub const MAX_NOISE_RULES: usize = 100;

/// Maximum length of a user-supplied regex pattern.
pub const MAX_PATTERN_LENGTH: usize = 512;

/// Maximum pending performance alerts; oldest dropped beyond this.
pub const MAX_PENDING_ALERTS: usize = 10;

/// Per-file size cap in the session store.
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Per-project total size cap in the session store.
pub const MAX_PROJECT_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum retained error-history entries.
pub const MAX_ERROR_HISTORY: usize = 500;

/// Resolved error-history entries older than this are pruned.
pub const STALE_ERROR_THRESHOLD: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default dirty-buffer flush interval for the session store.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Regression thresholds, percent of baseline unless noted otherwise.
pub mod perf {
    /// Page load time threshold (percent).
    pub const LOAD_THRESHOLD_PCT: f64 = 20.0;
    /// First contentful paint threshold (percent).
    pub const FCP_THRESHOLD_PCT: f64 = 20.0;
    /// Largest contentful paint threshold (percent).
    pub const LCP_THRESHOLD_PCT: f64 = 20.0;
    /// Time to first byte threshold (percent).
    pub const TTFB_THRESHOLD_PCT: f64 = 50.0;
    /// Cumulative layout shift threshold (absolute delta, unitless).
    pub const CLS_THRESHOLD_ABS: f64 = 0.1;
    /// Transfer size threshold (percent).
    pub const TRANSFER_THRESHOLD_PCT: f64 = 25.0;
}
