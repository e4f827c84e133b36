//! Per-category diff computation, severity, and summary assembly.

use beacon_core::constants::{
    DEGRADED_LATENCY_FACTOR, MAX_DIFF_ENTRIES_PER_CATEGORY, MAX_MESSAGE_LEN,
};
use beacon_core::{
    extract_url_path, fingerprint_message, CaptureReader, FxHashMap, FxHashSet, LogReader,
};

use crate::checkpoint::Checkpoint;
use crate::types::{
    ActionsDiff, ConsoleAggregate, ConsoleDiff, EndpointDegradation, EndpointFailure, NetworkDiff,
    Severity, SeverityFilter, WebSocketDiff, WsEndpoint,
};

/// New console entries, partitioned by level and deduplicated by
/// fingerprint. Info-level entries only contribute to `total_new`.
pub(crate) fn compute_console_diff(
    logs: &dyn LogReader,
    cp: &Checkpoint,
    filter: SeverityFilter,
) -> ConsoleDiff {
    let snapshot = logs.log_snapshot();
    let new_count = snapshot.total_added - cp.log_total;
    if new_count <= 0 {
        return ConsoleDiff::default();
    }
    let clamped = (new_count as usize).min(snapshot.entries.len());
    let tail = &snapshot.entries[snapshot.entries.len() - clamped..];

    let mut diff = ConsoleDiff {
        total_new: new_count,
        ..Default::default()
    };
    let mut error_index: FxHashMap<String, usize> = FxHashMap::default();
    let mut warning_index: FxHashMap<String, usize> = FxHashMap::default();

    for entry in tail {
        if entry.is_error() {
            aggregate(&mut diff.errors, &mut error_index, &entry.message, &entry.source);
        } else if entry.is_warning() && filter != SeverityFilter::ErrorsOnly {
            aggregate(&mut diff.warnings, &mut warning_index, &entry.message, &entry.source);
        }
    }
    diff
}

/// Dedup by fingerprint: the first occurrence records message and source,
/// later ones bump the count. New fingerprints past the cap are dropped.
fn aggregate(
    list: &mut Vec<ConsoleAggregate>,
    index: &mut FxHashMap<String, usize>,
    message: &str,
    source: &str,
) {
    let fingerprint = fingerprint_message(message);
    if let Some(&i) = index.get(&fingerprint) {
        list[i].count += 1;
        return;
    }
    if list.len() >= MAX_DIFF_ENTRIES_PER_CATEGORY {
        return;
    }
    index.insert(fingerprint, list.len());
    list.push(ConsoleAggregate {
        message: truncate_message(message),
        source: source.to_string(),
        count: 1,
    });
}

/// Truncate to the message cap on a valid UTF-8 boundary.
fn truncate_message(message: &str) -> String {
    if message.len() <= MAX_MESSAGE_LEN {
        return message.to_string();
    }
    let mut end = MAX_MESSAGE_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}

/// New network bodies classified against the checkpoint's known endpoints.
pub(crate) fn compute_network_diff(capture: &dyn CaptureReader, cp: &Checkpoint) -> NetworkDiff {
    let total = capture.network_total_added();
    let new_count = total - cp.network_total;
    if new_count <= 0 {
        return NetworkDiff::default();
    }
    let bodies = capture.network_bodies();
    let clamped = (new_count as usize).min(bodies.len());
    let tail = &bodies[bodies.len() - clamped..];

    let mut diff = NetworkDiff {
        total_new: clamped as i64,
        ..Default::default()
    };
    let mut seen_new: FxHashSet<String> = FxHashSet::default();

    for body in tail {
        let path = extract_url_path(&body.url);
        match cp.known_endpoints.get(&path) {
            Some(prev) if body.status >= 400 => {
                if prev.status < 400 && diff.failures.len() < MAX_DIFF_ENTRIES_PER_CATEGORY {
                    diff.failures.push(EndpointFailure {
                        path,
                        status: body.status,
                        previous_status: prev.status,
                    });
                }
            }
            Some(prev) => {
                if prev.duration_ms > 0.0
                    && body.duration_ms > prev.duration_ms * DEGRADED_LATENCY_FACTOR
                    && diff.degraded.len() < MAX_DIFF_ENTRIES_PER_CATEGORY
                {
                    diff.degraded.push(EndpointDegradation {
                        path,
                        duration_ms: body.duration_ms,
                        baseline_ms: prev.duration_ms,
                    });
                }
            }
            None => {
                if seen_new.insert(path.clone())
                    && diff.new_endpoints.len() < MAX_DIFF_ENTRIES_PER_CATEGORY
                {
                    diff.new_endpoints.push(path);
                }
            }
        }
    }
    diff
}

/// New WebSocket events partitioned by kind. Disconnections are dropped
/// under `errors_only`.
pub(crate) fn compute_websocket_diff(
    capture: &dyn CaptureReader,
    cp: &Checkpoint,
    filter: SeverityFilter,
) -> WebSocketDiff {
    let total = capture.websocket_total_added();
    let new_count = total - cp.ws_total;
    if new_count <= 0 {
        return WebSocketDiff::default();
    }
    let events = capture.websocket_events();
    let clamped = (new_count as usize).min(events.len());
    let tail = &events[events.len() - clamped..];

    let mut diff = WebSocketDiff {
        total_new: clamped as i64,
        ..Default::default()
    };
    for event in tail {
        let record = WsEndpoint {
            url: event.url.clone(),
            close_code: event.close_code,
            close_reason: if event.close_reason.is_empty() {
                None
            } else {
                Some(event.close_reason.clone())
            },
        };
        match event.event.as_str() {
            "open" => {
                if diff.connections.len() < MAX_DIFF_ENTRIES_PER_CATEGORY {
                    diff.connections.push(record);
                }
            }
            "close" => {
                if filter != SeverityFilter::ErrorsOnly
                    && diff.disconnections.len() < MAX_DIFF_ENTRIES_PER_CATEGORY
                {
                    diff.disconnections.push(record);
                }
            }
            "error" => {
                if diff.errors.len() < MAX_DIFF_ENTRIES_PER_CATEGORY {
                    diff.errors.push(record);
                }
            }
            _ => {}
        }
    }
    diff
}

/// New user actions: the first 50 of the window; `total_new` is unclamped.
pub(crate) fn compute_actions_diff(capture: &dyn CaptureReader, cp: &Checkpoint) -> ActionsDiff {
    let total = capture.action_total_added();
    let new_count = total - cp.action_total;
    if new_count <= 0 {
        return ActionsDiff::default();
    }
    let actions = capture.user_actions();
    let clamped = (new_count as usize).min(actions.len());
    let tail = &actions[actions.len() - clamped..];

    ActionsDiff {
        total_new: new_count,
        actions: tail.iter().take(MAX_DIFF_ENTRIES_PER_CATEGORY).cloned().collect(),
    }
}

/// Error beats warning beats clean; errors come from console errors or
/// network failures, warnings from console warnings or WS disconnections.
pub(crate) fn compute_severity(
    console: Option<&ConsoleDiff>,
    network: Option<&NetworkDiff>,
    websocket: Option<&WebSocketDiff>,
) -> Severity {
    let has_errors = console.is_some_and(|c| !c.errors.is_empty())
        || network.is_some_and(|n| !n.failures.is_empty());
    if has_errors {
        return Severity::Error;
    }
    let has_warnings = console.is_some_and(|c| !c.warnings.is_empty())
        || websocket.is_some_and(|w| !w.disconnections.is_empty());
    if has_warnings {
        Severity::Warning
    } else {
        Severity::Clean
    }
}

/// Comma-joined count clauses in priority order.
pub(crate) fn build_summary(
    console: Option<&ConsoleDiff>,
    network: Option<&NetworkDiff>,
    websocket: Option<&WebSocketDiff>,
) -> String {
    let error_count: usize = console.map_or(0, |c| c.errors.iter().map(|e| e.count).sum());
    let warning_count: usize = console.map_or(0, |c| c.warnings.iter().map(|w| w.count).sum());
    let failure_count = network.map_or(0, |n| n.failures.len());
    let disconnect_count = websocket.map_or(0, |w| w.disconnections.len());

    let mut clauses = Vec::new();
    if error_count > 0 {
        clauses.push(format!("{error_count} new console error(s)"));
    }
    if failure_count > 0 {
        clauses.push(format!("{failure_count} network failure(s)"));
    }
    if warning_count > 0 {
        clauses.push(format!("{warning_count} new console warning(s)"));
    }
    if disconnect_count > 0 {
        clauses.push(format!("{disconnect_count} WebSocket disconnection(s)"));
    }

    if clauses.is_empty() {
        "No significant changes.".to_string()
    } else {
        clauses.join(", ")
    }
}
