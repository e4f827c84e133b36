//! Cross-session error history.
//!
//! Fingerprints of observed errors are upserted into `errors/history.json`.
//! On every write the history is pruned: resolved entries stale for more
//! than 30 days are dropped and the list is truncated to the 500 entries
//! with the most recent activity.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use beacon_core::constants::{MAX_ERROR_HISTORY, STALE_ERROR_THRESHOLD};
use beacon_core::StoreError;

use crate::store::SessionStore;

const ERRORS_NAMESPACE: &str = "errors";
const HISTORY_KEY: &str = "history";

/// One tracked error fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorHistoryEntry {
    /// Canonical fingerprint of the error message.
    pub fingerprint: String,
    /// First observation.
    pub first_seen: DateTime<Utc>,
    /// Most recent observation.
    pub last_seen: DateTime<Utc>,
    /// Observation count.
    pub count: u64,
    /// Whether the error has been marked resolved.
    pub resolved: bool,
    /// When it was resolved, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl SessionStore {
    /// Record an observation of `fingerprint`, creating or updating its
    /// entry. A recurrence of a resolved error reopens it.
    pub fn record_error(&self, fingerprint: &str) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut history = self.error_history();

        match history.iter_mut().find(|e| e.fingerprint == fingerprint) {
            Some(entry) => {
                entry.last_seen = now;
                entry.count += 1;
                entry.resolved = false;
                entry.resolved_at = None;
            }
            None => history.push(ErrorHistoryEntry {
                fingerprint: fingerprint.to_string(),
                first_seen: now,
                last_seen: now,
                count: 1,
                resolved: false,
                resolved_at: None,
            }),
        }

        self.write_history(history)
    }

    /// Mark `fingerprint` resolved. Returns whether an entry was found.
    pub fn resolve_error(&self, fingerprint: &str) -> Result<bool, StoreError> {
        let mut history = self.error_history();
        let Some(entry) = history.iter_mut().find(|e| e.fingerprint == fingerprint) else {
            return Ok(false);
        };
        entry.resolved = true;
        entry.resolved_at = Some(Utc::now());
        self.write_history(history)?;
        Ok(true)
    }

    /// Load the current error history; missing or unparsable data yields an
    /// empty list.
    pub fn error_history(&self) -> Vec<ErrorHistoryEntry> {
        self.load(ERRORS_NAMESPACE, HISTORY_KEY)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    fn write_history(&self, mut history: Vec<ErrorHistoryEntry>) -> Result<(), StoreError> {
        prune_history(&mut history, Utc::now());
        let bytes = serde_json::to_vec_pretty(&history).map_err(|e| StoreError::Io {
            message: e.to_string(),
        })?;
        self.save(ERRORS_NAMESPACE, HISTORY_KEY, &bytes)
    }
}

/// Drop resolved entries stale past the threshold, then keep the 500 entries
/// with the most recent activity (original order otherwise preserved).
fn prune_history(history: &mut Vec<ErrorHistoryEntry>, now: DateTime<Utc>) {
    let stale = ChronoDuration::from_std(STALE_ERROR_THRESHOLD).unwrap_or(ChronoDuration::days(30));
    history.retain(|entry| {
        !(entry.resolved
            && entry
                .resolved_at
                .map(|at| now - at > stale)
                .unwrap_or(false))
    });

    if history.len() > MAX_ERROR_HISTORY {
        let mut cutoff: Vec<DateTime<Utc>> = history.iter().map(|e| e.last_seen).collect();
        cutoff.sort();
        let min_kept = cutoff[cutoff.len() - MAX_ERROR_HISTORY];
        let mut over = history.len() - MAX_ERROR_HISTORY;
        history.retain(|entry| {
            if over > 0 && entry.last_seen < min_kept {
                over -= 1;
                false
            } else {
                true
            }
        });
        // Ties at the cutoff can still leave the list over cap.
        history.truncate(MAX_ERROR_HISTORY);
    }
}
