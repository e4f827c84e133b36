//! # beacon-noise
//!
//! Rule-based noise classification for browser telemetry. Producers call the
//! filter before appending to the ring buffers, so noise never enters diff
//! scope. Rules are walked in insertion order with AND gates within a rule
//! (level, method, status range) and OR across its regex fields. A built-in
//! set covers browser internals, dev tooling, and analytics providers; user,
//! dismissed, and auto-detected rules are persisted through the session
//! store.

pub mod autodetect;
pub mod builtin;
pub mod filter;
pub mod persist;
pub mod rules;

pub use autodetect::RuleProposal;
pub use filter::NoiseFilter;
pub use persist::PersistedNoiseData;
pub use rules::{Classification, CompiledRule, MatchSpec, NoiseRule, NoiseStatistics, RuleCategory};
