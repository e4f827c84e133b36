//! Diff request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beacon_core::UserAction;

use crate::alerts::PerformanceAlert;

/// Severity filter on a diff request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityFilter {
    #[default]
    All,
    Warnings,
    ErrorsOnly,
}

/// A diff request. Omitted `include` means all four categories; unknown
/// category strings are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiffRequest {
    /// Checkpoint name, RFC 3339 timestamp, or empty for the implicit
    /// auto-checkpoint.
    pub checkpoint: Option<String>,
    /// Categories to include: "console", "network", "websocket", "actions".
    pub include: Option<Vec<String>>,
    pub severity: SeverityFilter,
}

impl DiffRequest {
    pub(crate) fn includes(&self, category: &str) -> bool {
        match &self.include {
            None => true,
            Some(list) => list.iter().any(|c| c == category),
        }
    }
}

/// Overall severity of a diff response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Clean,
    Warning,
    Error,
}

/// A deduplicated console entry group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleAggregate {
    /// First-seen message, truncated to 200 bytes on a UTF-8 boundary.
    pub message: String,
    /// First-seen source.
    pub source: String,
    /// Occurrences sharing this fingerprint in the window.
    pub count: usize,
}

/// New console activity since the checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleDiff {
    /// All new entries, including levels not broken out below.
    pub total_new: i64,
    pub errors: Vec<ConsoleAggregate>,
    pub warnings: Vec<ConsoleAggregate>,
}

impl ConsoleDiff {
    pub fn is_empty(&self) -> bool {
        self.total_new == 0 && self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// A known endpoint that started failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointFailure {
    pub path: String,
    pub status: u16,
    pub previous_status: u16,
}

/// A known endpoint that got markedly slower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDegradation {
    pub path: String,
    pub duration_ms: f64,
    pub baseline_ms: f64,
}

/// New network activity since the checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkDiff {
    pub total_new: i64,
    pub failures: Vec<EndpointFailure>,
    pub new_endpoints: Vec<String>,
    pub degraded: Vec<EndpointDegradation>,
}

impl NetworkDiff {
    pub fn is_empty(&self) -> bool {
        self.total_new == 0
            && self.failures.is_empty()
            && self.new_endpoints.is_empty()
            && self.degraded.is_empty()
    }
}

/// One WebSocket lifecycle occurrence in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsEndpoint {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<String>,
}

/// New WebSocket activity since the checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSocketDiff {
    pub total_new: i64,
    pub connections: Vec<WsEndpoint>,
    pub disconnections: Vec<WsEndpoint>,
    pub errors: Vec<WsEndpoint>,
}

impl WebSocketDiff {
    pub fn is_empty(&self) -> bool {
        self.total_new == 0
            && self.connections.is_empty()
            && self.disconnections.is_empty()
            && self.errors.is_empty()
    }
}

/// New user actions since the checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionsDiff {
    /// Unclamped count of new actions.
    pub total_new: i64,
    pub actions: Vec<UserAction>,
}

impl ActionsDiff {
    pub fn is_empty(&self) -> bool {
        self.total_new == 0 && self.actions.is_empty()
    }
}

/// The assembled diff response. Empty categories are elided.
#[derive(Debug, Clone, Serialize)]
pub struct DiffResponse {
    /// Position of the resolved checkpoint.
    pub from: DateTime<Utc>,
    /// When the diff was computed.
    pub to: DateTime<Utc>,
    /// Window width in milliseconds.
    pub duration_ms: i64,
    pub severity: Severity,
    pub summary: String,
    /// Rough size heuristic: serialized length / 4.
    pub token_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console: Option<ConsoleDiff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkDiff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub websocket: Option<WebSocketDiff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<ActionsDiff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_alerts: Option<Vec<PerformanceAlert>>,
}
