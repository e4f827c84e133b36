//! Reader traits consumed by the diff engine.
//!
//! The ring buffers themselves are owned by the capture layer; Beacon only
//! reads positions and slices the tail. Each buffer exposes a monotone
//! `total_added` counter that survives eviction, a snapshot that returns a
//! consistent (entries, total) pair, and the per-entry add-time slice
//! parallel to the entries. Invariant: `total_added - entries.len() >= 0`.

use chrono::{DateTime, Utc};

use crate::types::capture::{NetworkBody, UserAction, WebSocketEvent};
use crate::types::log::LogEntry;

/// A consistent view of the console buffer.
#[derive(Debug, Clone, Default)]
pub struct LogSnapshot {
    /// Current buffer contents, oldest first.
    pub entries: Vec<LogEntry>,
    /// Monotone count of entries ever appended.
    pub total_added: i64,
}

/// Read access to the console log ring buffer.
pub trait LogReader: Send + Sync {
    /// Consistent (entries, total_added) pair.
    fn log_snapshot(&self) -> LogSnapshot;
    /// Monotone append counter.
    fn log_total_added(&self) -> i64;
    /// Per-entry add times, parallel to the snapshot entries.
    fn log_timestamps(&self) -> Vec<DateTime<Utc>>;
    /// Add time of the oldest retained entry.
    fn oldest_log_time(&self) -> Option<DateTime<Utc>>;
    /// Add time of the newest retained entry.
    fn newest_log_time(&self) -> Option<DateTime<Utc>>;
}

/// Read access to the network, WebSocket, and user-action ring buffers.
pub trait CaptureReader: Send + Sync {
    fn network_total_added(&self) -> i64;
    fn network_timestamps(&self) -> Vec<DateTime<Utc>>;
    fn network_bodies(&self) -> Vec<NetworkBody>;

    fn websocket_total_added(&self) -> i64;
    fn websocket_timestamps(&self) -> Vec<DateTime<Utc>>;
    fn websocket_events(&self) -> Vec<WebSocketEvent>;

    fn action_total_added(&self) -> i64;
    fn action_timestamps(&self) -> Vec<DateTime<Utc>>;
    fn user_actions(&self) -> Vec<UserAction>;
}
