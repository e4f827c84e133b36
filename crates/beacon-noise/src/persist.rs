//! Noise-rule persistence through the session store.
//!
//! Only non-builtin rules are persisted. On load, persisted built-in ids are
//! rejected, rules whose set patterns no longer compile are dropped with a
//! warning, and the id counter resumes at
//! `max(next_user_id - 1, max observed user_N)`.

use serde::{Deserialize, Serialize};

use beacon_store::SessionStore;

use crate::rules::{CompiledRule, NoiseRule, NoiseStatistics};

pub const NOISE_NAMESPACE: &str = "noise";
pub const RULES_KEY: &str = "rules";

/// On-disk schema version; anything else is logged and ignored.
pub const SCHEMA_VERSION: u32 = 1;

/// The `noise/rules.json` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedNoiseData {
    pub version: u32,
    /// The id the next accepted rule would receive.
    pub next_user_id: u64,
    /// Non-builtin rules only.
    pub rules: Vec<NoiseRule>,
    #[serde(default)]
    pub statistics: NoiseStatistics,
}

/// Serialize current state to the store. Best-effort: failures are logged.
pub(crate) fn persist(
    store: &SessionStore,
    compiled: &[CompiledRule],
    counter: u64,
    statistics: &NoiseStatistics,
) {
    let data = PersistedNoiseData {
        version: SCHEMA_VERSION,
        next_user_id: counter + 1,
        rules: compiled
            .iter()
            .filter(|c| !c.rule.is_builtin())
            .map(|c| c.rule.clone())
            .collect(),
        statistics: statistics.clone(),
    };
    let bytes = match serde_json::to_vec_pretty(&data) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("noise: failed to serialize rules: {err}");
            return;
        }
    };
    if let Err(err) = store.save(NOISE_NAMESPACE, RULES_KEY, &bytes) {
        tracing::warn!("noise: failed to persist rules: {err}");
    }
}

/// Restore persisted rules and statistics into the given state. Missing or
/// invalid data leaves the built-in-only state untouched.
pub(crate) fn restore(
    store: &SessionStore,
    compiled: &mut Vec<CompiledRule>,
    counter: &mut u64,
    statistics: &mut NoiseStatistics,
) {
    let Ok(bytes) = store.load(NOISE_NAMESPACE, RULES_KEY) else {
        return;
    };
    let data: PersistedNoiseData = match serde_json::from_slice(&bytes) {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!("noise: corrupt persisted rules, ignoring: {err}");
            return;
        }
    };
    if data.version != SCHEMA_VERSION {
        tracing::warn!(
            "noise: persisted rules have version {} (expected {SCHEMA_VERSION}), ignoring",
            data.version
        );
        return;
    }

    let mut max_user_n = 0u64;
    for rule in data.rules {
        if rule.is_builtin() {
            tracing::warn!("noise: rejecting persisted built-in rule {}", rule.id);
            continue;
        }
        if let Some(n) = rule.id.strip_prefix("user_").and_then(|s| s.parse::<u64>().ok()) {
            max_user_n = max_user_n.max(n);
        }
        let recompiled = CompiledRule::compile(rule);
        if !recompiled.fully_compiled() {
            tracing::warn!(
                "noise: dropping persisted rule {} with non-compiling pattern",
                recompiled.rule.id
            );
            continue;
        }
        compiled.push(recompiled);
    }

    *counter = max_user_n.max(data.next_user_id.saturating_sub(1));
    *statistics = data.statistics;
}
