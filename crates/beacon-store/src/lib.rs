//! # beacon-store
//!
//! Persistent, namespaced key/value surface backing cross-session state:
//! noise rules, performance baselines, and error history. Keys are
//! `<namespace>/<key>.json` files under a per-project directory, capped at
//! 1 MiB per file and 10 MiB per project. Writes can be buffered in a dirty
//! buffer that a background thread flushes every 30 seconds.

pub mod context;
pub mod history;
pub mod meta;
pub mod store;

pub use context::SessionContext;
pub use history::ErrorHistoryEntry;
pub use meta::ProjectMeta;
pub use store::{SessionStore, StoreStats};
