//! Noise-rule persistence round-trips through the session store.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use beacon_core::LogEntry;
use beacon_noise::{Classification, MatchSpec, NoiseFilter, NoiseRule, PersistedNoiseData, RuleCategory};
use beacon_store::SessionStore;

fn open_store(tmp: &TempDir) -> Arc<SessionStore> {
    Arc::new(SessionStore::open(Path::new("/tmp/noise-project"), tmp.path()).unwrap())
}

fn console_rule(pattern: &str) -> NoiseRule {
    NoiseRule {
        id: String::new(),
        category: RuleCategory::Console,
        classification: Classification::Repetitive,
        matcher: MatchSpec {
            message_pattern: Some(pattern.to_string()),
            ..Default::default()
        },
        auto_detected: false,
        created_at: Utc::now(),
        reason: "test".to_string(),
    }
}

#[test]
fn persisted_rules_survive_reload() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);

    let filter = NoiseFilter::with_store(Arc::clone(&store));
    let builtin_count = filter.rule_count();
    filter.add(vec![console_rule("poll tick"), console_rule("other")]).unwrap();
    filter.is_console_noise(&LogEntry::new("info", "poll tick", ""));
    // Statistics are persisted on mutation; the dismiss below carries the
    // match recorded above to disk.
    filter.dismiss_noise("spinner", RuleCategory::Console, "chatter").unwrap();

    let reloaded = NoiseFilter::with_store(Arc::clone(&store));
    assert_eq!(reloaded.rule_count(), builtin_count + 3);
    let ids: Vec<String> = reloaded
        .list()
        .into_iter()
        .filter(|r| !r.is_builtin())
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["user_1", "user_2", "dismiss_3"]);

    // Statistics restored.
    let stats = reloaded.get_statistics();
    assert_eq!(stats.total_filtered, 1);
    assert_eq!(stats.per_rule.get("user_1"), Some(&1));

    // Counter resumes: the next rule continues the sequence.
    reloaded.add(vec![console_rule("more")]).unwrap();
    assert!(reloaded.list().iter().any(|r| r.id == "user_4"));
}

#[test]
fn persisted_builtins_and_bad_patterns_dropped() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);

    let mut builtin_imposter = console_rule("x");
    builtin_imposter.id = "builtin_favicon".to_string();
    let mut broken = console_rule("[unclosed");
    broken.id = "user_2".to_string();
    let mut good = console_rule("fine");
    good.id = "user_7".to_string();

    let data = PersistedNoiseData {
        version: 1,
        next_user_id: 3,
        rules: vec![builtin_imposter, broken, good],
        statistics: Default::default(),
    };
    store
        .save("noise", "rules", &serde_json::to_vec(&data).unwrap())
        .unwrap();

    let filter = NoiseFilter::with_store(Arc::clone(&store));
    let non_builtin: Vec<String> = filter
        .list()
        .into_iter()
        .filter(|r| !r.is_builtin())
        .map(|r| r.id)
        .collect();
    assert_eq!(non_builtin, vec!["user_7"]);

    // Counter restored to max(next_user_id - 1, max user_N) = 7.
    filter.add(vec![console_rule("next")]).unwrap();
    assert!(filter.list().iter().any(|r| r.id == "user_8"));
}

#[test]
fn version_mismatch_ignored_then_overwritten_on_mutation() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);

    let data = PersistedNoiseData {
        version: 2,
        next_user_id: 50,
        rules: vec![console_rule("stale")],
        statistics: Default::default(),
    };
    store
        .save("noise", "rules", &serde_json::to_vec(&data).unwrap())
        .unwrap();

    let filter = NoiseFilter::with_store(Arc::clone(&store));
    assert!(filter.list().iter().all(|r| r.is_builtin()));

    // First mutation persists fresh version-1 state.
    filter.add(vec![console_rule("fresh")]).unwrap();
    let bytes = store.load("noise", "rules").unwrap();
    let persisted: PersistedNoiseData = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(persisted.version, 1);
    assert_eq!(persisted.rules.len(), 1);
    assert_eq!(persisted.rules[0].id, "user_1");
}

#[test]
fn reset_persists_builtin_only_state() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);

    let filter = NoiseFilter::with_store(Arc::clone(&store));
    filter.add(vec![console_rule("x")]).unwrap();
    filter.reset();

    let bytes = store.load("noise", "rules").unwrap();
    let persisted: PersistedNoiseData = serde_json::from_slice(&bytes).unwrap();
    assert!(persisted.rules.is_empty());
    assert_eq!(persisted.next_user_id, 1);
    assert_eq!(persisted.statistics.total_filtered, 0);
}

#[test]
fn auto_detected_rules_persist() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp);

    let filter = NoiseFilter::with_store(Arc::clone(&store));
    // 30 identical messages → confidence 1.0-capped at 0.99 ≥ 0.9 → applied.
    let console: Vec<LogEntry> = (0..30)
        .map(|_| LogEntry::new("info", "heartbeat ok", "app.js:5"))
        .collect();
    let proposals = filter.auto_detect(&console, &[], &[]);
    assert_eq!(proposals.len(), 1);
    assert!(proposals[0].confidence >= 0.9);

    let reloaded = NoiseFilter::with_store(Arc::clone(&store));
    let auto: Vec<NoiseRule> = reloaded
        .list()
        .into_iter()
        .filter(|r| r.auto_detected)
        .collect();
    assert_eq!(auto.len(), 1);
    assert!(auto[0].id.starts_with("auto_"));
    assert!(reloaded.is_console_noise(&LogEntry::new("info", "heartbeat ok", "app.js:5")));
}
