//! # beacon-delta
//!
//! The checkpoint manager answers "what changed since the last time I
//! looked?" over the telemetry ring buffers. A checkpoint snapshots the
//! monotone `total_added` position of each buffer; a diff slices the tail of
//! each buffer past that position, deduplicates console entries by
//! fingerprint, classifies network endpoint transitions, assigns a severity,
//! and rides any pending performance regression alerts out on the response.

pub mod alerts;
pub mod checkpoint;
pub mod diff;
pub mod position;
pub mod types;

pub use alerts::{MetricDelta, PerformanceAlert};
pub use checkpoint::{Checkpoint, CheckpointManager, EndpointState};
pub use position::find_position_at_time;
pub use types::{
    ActionsDiff, ConsoleAggregate, ConsoleDiff, DiffRequest, DiffResponse, EndpointDegradation,
    EndpointFailure, NetworkDiff, Severity, SeverityFilter, WebSocketDiff, WsEndpoint,
};
