//! Checkpoint bookkeeping, resolution, and the diff entry point.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use beacon_core::constants::{MAX_CHECKPOINT_NAME_LEN, MAX_NAMED_CHECKPOINTS, MAX_PENDING_ALERTS};
use beacon_core::{
    extract_url_path, CaptureReader, CheckpointError, FxHashMap, LogReader, PerformanceBaseline,
    PerformanceSnapshot,
};

use crate::alerts::{self, PerformanceAlert, REGRESSION_RECOMMENDATION};
use crate::diff;
use crate::position::find_position_at_time;
use crate::types::{DiffRequest, DiffResponse, SeverityFilter};

/// Last observed status and latency of a URL path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointState {
    pub status: u16,
    pub duration_ms: f64,
}

/// A named position snapshot over all four buffers.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    /// Un-namespaced name (or a synthetic label for implicit/timestamp
    /// checkpoints).
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub log_total: i64,
    pub network_total: i64,
    pub ws_total: i64,
    pub action_total: i64,
    /// URL paths seen at capture time, with their last status and latency.
    pub known_endpoints: FxHashMap<String, EndpointState>,
    /// Alert delivery watermark at capture time.
    pub alert_delivery: u64,
}

impl Checkpoint {
    /// The zero checkpoint used when no auto checkpoint exists yet: every
    /// buffered entry counts as new.
    fn at_origin() -> Self {
        Self {
            name: String::new(),
            created_at: Utc::now(),
            log_total: 0,
            network_total: 0,
            ws_total: 0,
            action_total: 0,
            known_endpoints: FxHashMap::default(),
            alert_delivery: 0,
        }
    }
}

struct ManagerState {
    named: FxHashMap<String, Checkpoint>,
    /// Keys of `named` in insertion order; index 0 is evicted first.
    insertion_order: Vec<String>,
    auto: Option<Checkpoint>,
    pending_alerts: Vec<PerformanceAlert>,
    alert_counter: u64,
    alert_delivery: u64,
}

/// Owns checkpoints and pending alerts; computes diffs on demand.
///
/// One mutex covers the whole manager state for the duration of a call.
/// Reader snapshots taken under it rely on each reader's own lock, so two
/// consecutive reads are not globally atomic; the snapshot pair contract
/// within each reader keeps any variance to ±1 counter.
pub struct CheckpointManager {
    logs: Arc<dyn LogReader>,
    capture: Arc<dyn CaptureReader>,
    inner: Mutex<ManagerState>,
}

impl CheckpointManager {
    pub fn new(logs: Arc<dyn LogReader>, capture: Arc<dyn CaptureReader>) -> Self {
        Self {
            logs,
            capture,
            inner: Mutex::new(ManagerState {
                named: FxHashMap::default(),
                insertion_order: Vec::new(),
                auto: None,
                pending_alerts: Vec::new(),
                alert_counter: 0,
                alert_delivery: 0,
            }),
        }
    }

    /// Create (or refresh) a named checkpoint at the current buffer
    /// positions. Keys are namespaced by client id; the stored checkpoint
    /// carries the bare name. Past 20 named checkpoints the oldest by
    /// insertion order is evicted.
    pub fn create_checkpoint(&self, name: &str, client_id: &str) -> Result<(), CheckpointError> {
        if name.is_empty() {
            return Err(CheckpointError::EmptyName);
        }
        if name.len() > MAX_CHECKPOINT_NAME_LEN {
            return Err(CheckpointError::NameTooLong {
                len: name.len(),
                max: MAX_CHECKPOINT_NAME_LEN,
            });
        }

        let mut state = self.inner.lock().expect("manager lock poisoned");
        let cp = self.capture_checkpoint(name, state.alert_delivery);
        let key = if client_id.is_empty() {
            name.to_string()
        } else {
            format!("{client_id}:{name}")
        };

        if state.named.contains_key(&key) {
            state.named.insert(key, cp);
            return Ok(());
        }
        state.insertion_order.push(key.clone());
        state.named.insert(key, cp);
        if state.insertion_order.len() > MAX_NAMED_CHECKPOINTS {
            let evicted = state.insertion_order.remove(0);
            state.named.remove(&evicted);
        }
        Ok(())
    }

    pub fn named_checkpoint_count(&self) -> usize {
        self.inner.lock().expect("manager lock poisoned").named.len()
    }

    /// Whether a checkpoint exists under this client's key (or the bare
    /// name when `client_id` is empty).
    pub fn has_checkpoint(&self, name: &str, client_id: &str) -> bool {
        let key = if client_id.is_empty() {
            name.to_string()
        } else {
            format!("{client_id}:{name}")
        };
        self.inner
            .lock()
            .expect("manager lock poisoned")
            .named
            .contains_key(&key)
    }

    /// Current auto checkpoint, if any implicit query has run.
    pub fn auto_checkpoint(&self) -> Option<Checkpoint> {
        self.inner.lock().expect("manager lock poisoned").auto.clone()
    }

    /// Compute the delta since the requested checkpoint. Implicit requests
    /// (no checkpoint named) advance the auto checkpoint after the response
    /// is assembled; named requests never do.
    pub fn get_changes_since(&self, request: &DiffRequest, client_id: &str) -> DiffResponse {
        let mut state = self.inner.lock().expect("manager lock poisoned");
        let (cp, implicit) =
            self.resolve(&state, request.checkpoint.as_deref().unwrap_or(""), client_id);

        let filter = request.severity;
        let console = request
            .includes("console")
            .then(|| diff::compute_console_diff(self.logs.as_ref(), &cp, filter));
        let network = request
            .includes("network")
            .then(|| diff::compute_network_diff(self.capture.as_ref(), &cp));
        let websocket = request
            .includes("websocket")
            .then(|| diff::compute_websocket_diff(self.capture.as_ref(), &cp, filter));
        let actions = request
            .includes("actions")
            .then(|| diff::compute_actions_diff(self.capture.as_ref(), &cp));

        // Under errors_only a WebSocket diff without errors is dropped
        // entirely; with errors it is kept.
        let websocket = match websocket {
            Some(ws) if filter == SeverityFilter::ErrorsOnly && ws.errors.is_empty() => None,
            other => other,
        };

        let severity = diff::compute_severity(console.as_ref(), network.as_ref(), websocket.as_ref());
        let summary = diff::build_summary(console.as_ref(), network.as_ref(), websocket.as_ref());

        let console = console.filter(|c| !c.is_empty());
        let network = network.filter(|n| !n.is_empty());
        let websocket = websocket.filter(|w| !w.is_empty());
        let actions = actions.filter(|a| !a.is_empty());

        let pending: Vec<PerformanceAlert> = state
            .pending_alerts
            .iter()
            .filter(|a| a.pending_for(cp.alert_delivery))
            .cloned()
            .collect();
        let performance_alerts = (!pending.is_empty()).then_some(pending);

        let now = Utc::now();
        let mut response = DiffResponse {
            from: cp.created_at,
            to: now,
            duration_ms: (now - cp.created_at).num_milliseconds(),
            severity,
            summary,
            token_count: 0,
            console,
            network,
            websocket,
            actions,
            performance_alerts,
        };
        response.token_count = serde_json::to_string(&response)
            .map(|s| s.len() / 4)
            .unwrap_or(0);

        if implicit {
            self.advance_auto(&mut state, &cp);
        }
        response
    }

    /// Resolution order: implicit → client-namespaced name → bare name →
    /// RFC 3339 timestamp → fresh empty checkpoint at now.
    fn resolve(&self, state: &ManagerState, checkpoint: &str, client_id: &str) -> (Checkpoint, bool) {
        if checkpoint.is_empty() {
            let cp = state.auto.clone().unwrap_or_else(Checkpoint::at_origin);
            return (cp, true);
        }
        if !client_id.is_empty() {
            if let Some(cp) = state.named.get(&format!("{client_id}:{checkpoint}")) {
                return (cp.clone(), false);
            }
        }
        if let Some(cp) = state.named.get(checkpoint) {
            return (cp.clone(), false);
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(checkpoint) {
            return (self.checkpoint_at_time(parsed.with_timezone(&Utc), state.alert_delivery), false);
        }
        tracing::debug!("checkpoint {checkpoint:?} not found; diff will be empty");
        (self.capture_checkpoint(checkpoint, state.alert_delivery), false)
    }

    /// Snapshot current buffer positions and network endpoints.
    fn capture_checkpoint(&self, name: &str, alert_delivery: u64) -> Checkpoint {
        let mut known_endpoints = FxHashMap::default();
        for body in self.capture.network_bodies() {
            known_endpoints.insert(
                extract_url_path(&body.url),
                EndpointState {
                    status: body.status,
                    duration_ms: body.duration_ms,
                },
            );
        }
        Checkpoint {
            name: name.to_string(),
            created_at: Utc::now(),
            log_total: self.logs.log_total_added(),
            network_total: self.capture.network_total_added(),
            ws_total: self.capture.websocket_total_added(),
            action_total: self.capture.action_total_added(),
            known_endpoints,
            alert_delivery,
        }
    }

    /// Resolve per-buffer positions at a past instant via the timestamp
    /// slices.
    fn checkpoint_at_time(&self, t: DateTime<Utc>, alert_delivery: u64) -> Checkpoint {
        Checkpoint {
            name: t.to_rfc3339(),
            created_at: t,
            log_total: find_position_at_time(&self.logs.log_timestamps(), self.logs.log_total_added(), t),
            network_total: find_position_at_time(
                &self.capture.network_timestamps(),
                self.capture.network_total_added(),
                t,
            ),
            ws_total: find_position_at_time(
                &self.capture.websocket_timestamps(),
                self.capture.websocket_total_added(),
                t,
            ),
            action_total: find_position_at_time(
                &self.capture.action_timestamps(),
                self.capture.action_total_added(),
                t,
            ),
            known_endpoints: FxHashMap::default(),
            alert_delivery,
        }
    }

    /// Post-response bookkeeping for implicit queries: acknowledge pending
    /// alerts, then replace the auto checkpoint with fresh positions and the
    /// previous known-endpoint map overlaid with the current one.
    fn advance_auto(&self, state: &mut ManagerState, previous: &Checkpoint) {
        let watermark = state.alert_delivery;
        for alert in &mut state.pending_alerts {
            if alert.delivered_at == 0 {
                alert.delivered_at = watermark;
            }
        }

        let mut advanced = self.capture_checkpoint("auto", state.alert_delivery);
        let mut known = previous.known_endpoints.clone();
        known.extend(advanced.known_endpoints.drain());
        advanced.known_endpoints = known;
        state.auto = Some(advanced);
    }

    /// Compare a performance snapshot against its baseline and store a
    /// regression alert when thresholds are exceeded. The first observation
    /// of a URL only establishes the baseline. Detecting a clean snapshot
    /// resolves any pending alert for that URL; a new regression replaces
    /// it. Pending alerts are capped at 10, oldest dropped.
    pub fn detect_and_store_alerts(
        &self,
        snapshot: &PerformanceSnapshot,
        baseline_before: &PerformanceBaseline,
    ) {
        if baseline_before.sample_count < 1 {
            return;
        }
        let deltas = alerts::compute_metric_deltas(snapshot, baseline_before);

        let mut state = self.inner.lock().expect("manager lock poisoned");
        // Rewrite rather than truncate in place, so the backing array is
        // not pinned by removed alerts.
        let retained: Vec<PerformanceAlert> = state
            .pending_alerts
            .iter()
            .filter(|a| a.url != snapshot.url)
            .cloned()
            .collect();
        state.pending_alerts = retained;
        if deltas.is_empty() {
            return;
        }

        state.alert_counter += 1;
        state.alert_delivery += 1;
        let summary = alerts::build_summary(&deltas, &snapshot.url);
        let metrics: FxHashMap<String, crate::alerts::MetricDelta> = deltas
            .into_iter()
            .map(|(name, delta)| (name.to_string(), delta))
            .collect();

        let alert = PerformanceAlert {
            id: format!("alert_{}", state.alert_counter),
            alert_type: "regression".to_string(),
            url: snapshot.url.clone(),
            detected_at: Utc::now(),
            summary,
            metrics,
            recommendation: REGRESSION_RECOMMENDATION.to_string(),
            delivered_at: 0,
        };
        state.pending_alerts.push(alert);

        if state.pending_alerts.len() > MAX_PENDING_ALERTS {
            let excess = state.pending_alerts.len() - MAX_PENDING_ALERTS;
            let capped = state.pending_alerts[excess..].to_vec();
            state.pending_alerts = capped;
        }
    }

    /// Current pending alerts (delivered or not), for inspection.
    pub fn pending_alerts(&self) -> Vec<PerformanceAlert> {
        self.inner
            .lock()
            .expect("manager lock poisoned")
            .pending_alerts
            .clone()
    }
}
