//! # beacon-core
//!
//! Foundation crate for the Beacon telemetry engine.
//! Defines the telemetry entry types, reader traits, errors, constants, and
//! the shared primitives (fingerprinting, URL-path extraction, path
//! validation, regex safety). Every other crate in the workspace depends on
//! this.

pub mod constants;
pub mod errors;
pub mod fingerprint;
pub mod pathsafe;
pub mod regex_guard;
pub mod traits;
pub mod types;
pub mod urlpath;

// Re-export the most commonly used items at the crate root.
pub use errors::{CheckpointError, NoiseError, StoreError};
pub use fingerprint::fingerprint_message;
pub use traits::{CaptureReader, LogReader, LogSnapshot};
pub use types::capture::{NetworkBody, UserAction, WebSocketEvent};
pub use types::collections::{FxHashMap, FxHashSet};
pub use types::log::LogEntry;
pub use types::perf::{PerformanceBaseline, PerformanceSnapshot};
pub use urlpath::extract_url_path;
