//! Session context assembly from well-known store files.

use serde::Serialize;
use serde_json::Value;

use beacon_core::FxHashMap;

use crate::history::ErrorHistoryEntry;
use crate::store::SessionStore;

/// Everything a new session wants to know about prior sessions, read
/// opportunistically: missing or unparsable files are simply absent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionContext {
    /// Stable project identifier.
    pub project_id: String,
    /// Sessions opened against this project, including the current one.
    pub session_count: u64,
    /// Performance baselines keyed by name (`baselines/<name>.json`).
    pub baselines: FxHashMap<String, Value>,
    /// Persisted noise configuration (`noise/rules.json`), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_config: Option<Value>,
    /// Tracked error history (`errors/history.json`).
    pub error_history: Vec<ErrorHistoryEntry>,
    /// Observed API schema (`api_schema/schema.json`), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_schema: Option<Value>,
    /// Per-endpoint performance data (`performance/endpoints.json`), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<Value>,
}

impl SessionStore {
    /// Assemble the session context from the well-known files.
    pub fn load_session_context(&self) -> SessionContext {
        let meta = self.get_meta();

        let mut baselines = FxHashMap::default();
        for name in self.list("baselines").unwrap_or_default() {
            if let Some(value) = self.load_json("baselines", &name) {
                baselines.insert(name, value);
            }
        }

        SessionContext {
            project_id: meta.project_id,
            session_count: meta.session_count,
            baselines,
            noise_config: self.load_json("noise", "rules"),
            error_history: self.error_history(),
            api_schema: self.load_json("api_schema", "schema"),
            performance: self.load_json("performance", "endpoints"),
        }
    }

    fn load_json(&self, namespace: &str, key: &str) -> Option<Value> {
        let bytes = self.load(namespace, key).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_context_reads_well_known_files() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::open(Path::new("/tmp/ctx-project"), tmp.path()).unwrap();

        store.save("baselines", "home", br#"{"load_ms":900}"#).unwrap();
        store.save("baselines", "checkout", br#"{"load_ms":1400}"#).unwrap();
        store.save("noise", "rules", br#"{"version":1,"rules":[]}"#).unwrap();
        store.record_error("boom").unwrap();

        let ctx = store.load_session_context();
        assert_eq!(ctx.session_count, 1);
        assert_eq!(ctx.baselines.len(), 2);
        assert_eq!(ctx.baselines["home"]["load_ms"], 900);
        assert!(ctx.noise_config.is_some());
        assert_eq!(ctx.error_history.len(), 1);
        assert!(ctx.api_schema.is_none());
        assert!(ctx.performance.is_none());
    }

    #[test]
    fn test_context_tolerates_unparsable_files() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::open(Path::new("/tmp/ctx-project-2"), tmp.path()).unwrap();
        store.save("noise", "rules", b"not json").unwrap();

        let ctx = store.load_session_context();
        assert!(ctx.noise_config.is_none());
        assert!(ctx.baselines.is_empty());
    }
}
