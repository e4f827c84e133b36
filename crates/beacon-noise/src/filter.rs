//! The noise filter: rule evaluation, statistics, and mutation surface.

use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;

use beacon_core::constants::MAX_NOISE_RULES;
use beacon_core::regex_guard::validate_regex_pattern;
use beacon_core::{LogEntry, NetworkBody, NoiseError, WebSocketEvent};
use beacon_store::SessionStore;

use crate::autodetect::{self, RuleProposal, AUTO_APPLY_CONFIDENCE};
use crate::builtin::builtin_rules;
use crate::rules::{
    Classification, CompiledRule, MatchSpec, NoiseRule, NoiseStatistics, RuleCategory,
};

/// Rules plus the id counter shared by `user_N` / `dismiss_N` / `auto_N`.
struct RuleSet {
    compiled: Vec<CompiledRule>,
    counter: u64,
}

impl RuleSet {
    fn builtins_only() -> Self {
        Self {
            compiled: builtin_rules().into_iter().map(CompiledRule::compile).collect(),
            counter: 0,
        }
    }
}

/// Classifies telemetry entries as noise before they enter the buffers.
pub struct NoiseFilter {
    /// Lock order: `rules` strictly before `stats`; never the reverse.
    rules: RwLock<RuleSet>,
    stats: Mutex<NoiseStatistics>,
    store: Option<Arc<SessionStore>>,
}

impl NoiseFilter {
    /// A filter with the built-in rules and no persistence.
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(RuleSet::builtins_only()),
            stats: Mutex::new(NoiseStatistics::default()),
            store: None,
        }
    }

    /// A filter backed by the session store: persisted rules and statistics
    /// are restored, and every mutation is written back.
    pub fn with_store(store: Arc<SessionStore>) -> Self {
        let mut set = RuleSet::builtins_only();
        let mut stats = NoiseStatistics::default();
        crate::persist::restore(&store, &mut set.compiled, &mut set.counter, &mut stats);
        Self {
            rules: RwLock::new(set),
            stats: Mutex::new(stats),
            store: Some(store),
        }
    }

    /// Defensive copy of all rules in evaluation order.
    pub fn list(&self) -> Vec<NoiseRule> {
        let set = self.rules.read().expect("rules lock poisoned");
        set.compiled.iter().map(|c| c.rule.clone()).collect()
    }

    /// Number of rules currently loaded.
    pub fn rule_count(&self) -> usize {
        self.rules.read().expect("rules lock poisoned").compiled.len()
    }

    /// Append user rules. All patterns are validated before any rule is
    /// accepted; rules past the cap are silently dropped. Supplied ids and
    /// timestamps are overwritten.
    pub fn add(&self, rules: Vec<NoiseRule>) -> Result<(), NoiseError> {
        for rule in &rules {
            rule.validate()?;
        }

        let mut set = self.rules.write().expect("rules lock poisoned");
        let mut next = set.compiled.clone();
        for mut rule in rules {
            if next.len() >= MAX_NOISE_RULES {
                break;
            }
            set.counter += 1;
            rule.id = format!("user_{}", set.counter);
            rule.created_at = Utc::now();
            rule.auto_detected = false;
            next.push(CompiledRule::compile(rule));
        }
        set.compiled = next;
        self.persist_locked(&set);
        Ok(())
    }

    /// Remove a rule by id. Built-ins cannot be removed.
    pub fn remove(&self, id: &str) -> Result<(), NoiseError> {
        if id.starts_with(crate::rules::BUILTIN_PREFIX) {
            return Err(NoiseError::BuiltinImmutable { id: id.to_string() });
        }

        let mut set = self.rules.write().expect("rules lock poisoned");
        if !set.compiled.iter().any(|c| c.rule.id == id) {
            return Err(NoiseError::RuleNotFound { id: id.to_string() });
        }
        let remaining: Vec<CompiledRule> = set
            .compiled
            .iter()
            .filter(|c| c.rule.id != id)
            .cloned()
            .collect();
        set.compiled = remaining;
        self.persist_locked(&set);
        Ok(())
    }

    /// Wipe user/auto/dismissed rules, restore built-ins, zero statistics,
    /// and reset the id counter.
    pub fn reset(&self) {
        let mut set = self.rules.write().expect("rules lock poisoned");
        *set = RuleSet::builtins_only();
        {
            let mut stats = self.stats.lock().expect("stats lock poisoned");
            *stats = NoiseStatistics::default();
        }
        self.persist_locked(&set);
    }

    /// Dismiss a recurring pattern: creates a `dismiss_N` rule on the
    /// category-appropriate regex field. No-op at the rule cap.
    pub fn dismiss_noise(
        &self,
        pattern: &str,
        category: RuleCategory,
        reason: &str,
    ) -> Result<(), NoiseError> {
        validate_regex_pattern(pattern)?;

        let mut set = self.rules.write().expect("rules lock poisoned");
        if set.compiled.len() >= MAX_NOISE_RULES {
            return Ok(());
        }

        let matcher = match category {
            RuleCategory::Console => MatchSpec {
                message_pattern: Some(pattern.to_string()),
                ..Default::default()
            },
            RuleCategory::Network | RuleCategory::Websocket => MatchSpec {
                url_pattern: Some(pattern.to_string()),
                ..Default::default()
            },
        };

        set.counter += 1;
        let rule = NoiseRule {
            id: format!("dismiss_{}", set.counter),
            category,
            classification: Classification::Dismissed,
            matcher,
            auto_detected: false,
            created_at: Utc::now(),
            reason: reason.to_string(),
        };
        let mut next = set.compiled.clone();
        next.push(CompiledRule::compile(rule));
        set.compiled = next;
        self.persist_locked(&set);
        Ok(())
    }

    /// Whether a console entry is noise.
    pub fn is_console_noise(&self, entry: &LogEntry) -> bool {
        let set = self.rules.read().expect("rules lock poisoned");
        for compiled in &set.compiled {
            if compiled.rule.category != RuleCategory::Console {
                continue;
            }
            let spec = &compiled.rule.matcher;
            if let Some(level) = spec.level.as_deref() {
                if !level.is_empty() && level != entry.level {
                    continue;
                }
            }
            let message_hit = compiled
                .message_re
                .as_ref()
                .is_some_and(|re| re.is_match(&entry.message));
            let source_hit = compiled
                .source_re
                .as_ref()
                .is_some_and(|re| re.is_match(&entry.source));
            if message_hit || source_hit {
                self.record_noise(&compiled.rule.id);
                return true;
            }
        }
        self.record_signal();
        false
    }

    /// Whether a network body is noise. Auth failures (401/403) are never
    /// noise, regardless of rules.
    pub fn is_network_noise(&self, body: &NetworkBody) -> bool {
        if body.status == 401 || body.status == 403 {
            return false;
        }

        let set = self.rules.read().expect("rules lock poisoned");
        for compiled in &set.compiled {
            if compiled.rule.category != RuleCategory::Network {
                continue;
            }
            let spec = &compiled.rule.matcher;
            if spec.has_method() && spec.method.as_deref() != Some(body.method.as_str()) {
                continue;
            }
            if spec.has_status_min() && body.status < spec.status_min.unwrap_or(0) {
                continue;
            }
            if let Some(max) = spec.status_max {
                if max > 0 && body.status > max {
                    continue;
                }
            }
            let matched = if spec.has_url_pattern() {
                compiled.url_re.as_ref().is_some_and(|re| re.is_match(&body.url))
            } else {
                // Filter-only rule: matches by method/status gates alone.
                spec.has_method() || spec.has_status_min()
            };
            if matched {
                self.record_noise(&compiled.rule.id);
                return true;
            }
        }
        self.record_signal();
        false
    }

    /// Whether a WebSocket event is noise. WebSocket rules require a URL
    /// pattern.
    pub fn is_websocket_noise(&self, event: &WebSocketEvent) -> bool {
        let set = self.rules.read().expect("rules lock poisoned");
        for compiled in &set.compiled {
            if compiled.rule.category != RuleCategory::Websocket {
                continue;
            }
            if !compiled.rule.matcher.has_url_pattern() {
                continue;
            }
            if compiled.url_re.as_ref().is_some_and(|re| re.is_match(&event.url)) {
                self.record_noise(&compiled.rule.id);
                return true;
            }
        }
        self.record_signal();
        false
    }

    /// Deep copy of the current statistics.
    pub fn get_statistics(&self) -> NoiseStatistics {
        self.stats.lock().expect("stats lock poisoned").clone()
    }

    /// Analyse buffer contents and propose new rules. Proposals with
    /// confidence ≥ 0.9 are applied in the same call (id `auto_N`) while
    /// room remains under the cap; all proposals are returned regardless.
    ///
    /// Holds the write lock for the whole analysis; intended for infrequent
    /// manual invocation, not per-event.
    pub fn auto_detect(
        &self,
        console: &[LogEntry],
        network: &[NetworkBody],
        _ws: &[WebSocketEvent],
    ) -> Vec<RuleProposal> {
        let mut set = self.rules.write().expect("rules lock poisoned");
        let proposals = autodetect::analyze(&set.compiled, console, network);

        let mut applied = false;
        for proposal in &proposals {
            if proposal.confidence < AUTO_APPLY_CONFIDENCE || set.compiled.len() >= MAX_NOISE_RULES {
                continue;
            }
            set.counter += 1;
            let rule = proposal.to_rule(format!("auto_{}", set.counter));
            let mut next = set.compiled.clone();
            next.push(CompiledRule::compile(rule));
            set.compiled = next;
            applied = true;
        }
        if applied {
            self.persist_locked(&set);
        }
        proposals
    }

    /// Record a rule match. Takes only the stats lock; the caller holds the
    /// rules lock.
    fn record_noise(&self, rule_id: &str) {
        let mut stats = self.stats.lock().expect("stats lock poisoned");
        stats.total_filtered += 1;
        *stats.per_rule.entry(rule_id.to_string()).or_insert(0) += 1;
        stats.last_noise_at = Some(Utc::now());
    }

    fn record_signal(&self) {
        let mut stats = self.stats.lock().expect("stats lock poisoned");
        stats.last_signal_at = Some(Utc::now());
    }

    /// Persist non-builtin rules and statistics. Caller holds the rules
    /// lock; the stats lock is taken inside (order: rules → stats).
    fn persist_locked(&self, set: &RuleSet) {
        let Some(store) = &self.store else {
            return;
        };
        let stats = self.stats.lock().expect("stats lock poisoned").clone();
        crate::persist::persist(store, &set.compiled, set.counter, &stats);
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console_rule(matcher: MatchSpec) -> NoiseRule {
        NoiseRule {
            id: String::new(),
            category: RuleCategory::Console,
            classification: Classification::Repetitive,
            matcher,
            auto_detected: false,
            created_at: Utc::now(),
            reason: String::new(),
        }
    }

    fn network_rule(matcher: MatchSpec) -> NoiseRule {
        NoiseRule {
            id: String::new(),
            category: RuleCategory::Network,
            classification: Classification::Infrastructure,
            matcher,
            auto_detected: false,
            created_at: Utc::now(),
            reason: String::new(),
        }
    }

    #[test]
    fn test_builtin_favicon_is_noise() {
        let filter = NoiseFilter::new();
        let body = NetworkBody {
            url: "https://app.test/favicon.ico".to_string(),
            method: "GET".to_string(),
            status: 200,
            ..Default::default()
        };
        assert!(filter.is_network_noise(&body));
    }

    #[test]
    fn test_auth_failures_never_noise() {
        let filter = NoiseFilter::new();
        // A URL rule that would otherwise match.
        filter
            .add(vec![network_rule(MatchSpec {
                url_pattern: Some("/api/".to_string()),
                ..Default::default()
            })])
            .unwrap();
        for status in [401, 403] {
            let body = NetworkBody {
                url: "https://app.test/api/secret".to_string(),
                method: "GET".to_string(),
                status,
                ..Default::default()
            };
            assert!(!filter.is_network_noise(&body), "status {status} must never be noise");
        }
        // Same URL with a different status does match.
        let ok = NetworkBody {
            url: "https://app.test/api/secret".to_string(),
            method: "GET".to_string(),
            status: 200,
            ..Default::default()
        };
        assert!(filter.is_network_noise(&ok));
    }

    #[test]
    fn test_filter_only_rule_matches_options_preflight() {
        let filter = NoiseFilter::new();
        let body = NetworkBody {
            url: "https://app.test/api/users".to_string(),
            method: "OPTIONS".to_string(),
            status: 204,
            ..Default::default()
        };
        assert!(filter.is_network_noise(&body));
        let stats = filter.get_statistics();
        assert_eq!(stats.per_rule.get("builtin_cors_preflight"), Some(&1));
    }

    #[test]
    fn test_user_rule_matches_by_gates_alone() {
        let filter = NoiseFilter::new();
        filter
            .add(vec![network_rule(MatchSpec {
                method: Some("HEAD".to_string()),
                status_min: Some(200),
                ..Default::default()
            })])
            .unwrap();

        let head = NetworkBody {
            url: "https://app.test/resource".to_string(),
            method: "HEAD".to_string(),
            status: 204,
            ..Default::default()
        };
        assert!(filter.is_network_noise(&head));

        // Method gate blocks.
        let put = NetworkBody {
            method: "PUT".to_string(),
            status: 204,
            url: "https://app.test/resource".to_string(),
            ..Default::default()
        };
        assert!(!filter.is_network_noise(&put));

        // Status below the minimum blocks.
        let low = NetworkBody {
            method: "HEAD".to_string(),
            status: 101,
            url: "https://app.test/resource".to_string(),
            ..Default::default()
        };
        assert!(!filter.is_network_noise(&low));
    }

    #[test]
    fn test_console_level_gate_and_or_fields() {
        let filter = NoiseFilter::new();
        filter
            .add(vec![console_rule(MatchSpec {
                message_pattern: Some("^poll tick$".to_string()),
                source_pattern: Some("poller\\.js".to_string()),
                level: Some("info".to_string()),
                ..Default::default()
            })])
            .unwrap();

        // Message match, level matches.
        assert!(filter.is_console_noise(&LogEntry::new("info", "poll tick", "app.js:1")));
        // Source match alone suffices.
        assert!(filter.is_console_noise(&LogEntry::new("info", "other", "poller.js:10")));
        // Level gate blocks.
        assert!(!filter.is_console_noise(&LogEntry::new("error", "poll tick", "poller.js:10")));
    }

    #[test]
    fn test_websocket_requires_url_pattern() {
        let filter = NoiseFilter::new();
        let dev = WebSocketEvent {
            event: "open".to_string(),
            url: "ws://localhost:3000/sockjs-node/123".to_string(),
            ..Default::default()
        };
        assert!(filter.is_websocket_noise(&dev));
        let app = WebSocketEvent {
            event: "open".to_string(),
            url: "wss://app.test/realtime".to_string(),
            ..Default::default()
        };
        assert!(!filter.is_websocket_noise(&app));
    }

    #[test]
    fn test_add_assigns_sequential_user_ids() {
        let filter = NoiseFilter::new();
        filter
            .add(vec![
                console_rule(MatchSpec {
                    message_pattern: Some("a".to_string()),
                    ..Default::default()
                }),
                console_rule(MatchSpec {
                    message_pattern: Some("b".to_string()),
                    ..Default::default()
                }),
            ])
            .unwrap();
        let ids: Vec<String> = filter
            .list()
            .into_iter()
            .filter(|r| !r.is_builtin())
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["user_1", "user_2"]);
    }

    #[test]
    fn test_add_validates_all_before_accepting_any() {
        let filter = NoiseFilter::new();
        let before = filter.rule_count();
        let err = filter.add(vec![
            console_rule(MatchSpec {
                message_pattern: Some("fine".to_string()),
                ..Default::default()
            }),
            console_rule(MatchSpec {
                message_pattern: Some("(a+)+".to_string()),
                ..Default::default()
            }),
        ]);
        assert!(err.is_err());
        assert_eq!(filter.rule_count(), before, "no rule from a failed batch is kept");
    }

    #[test]
    fn test_rules_past_cap_silently_dropped() {
        let filter = NoiseFilter::new();
        let builtin_count = filter.rule_count();
        let room = MAX_NOISE_RULES - builtin_count;
        let batch: Vec<NoiseRule> = (0..room + 5)
            .map(|i| {
                console_rule(MatchSpec {
                    message_pattern: Some(format!("pattern {i}")),
                    ..Default::default()
                })
            })
            .collect();
        filter.add(batch).unwrap();
        assert_eq!(filter.rule_count(), MAX_NOISE_RULES);
    }

    #[test]
    fn test_remove_builtin_and_missing() {
        let filter = NoiseFilter::new();
        assert!(matches!(
            filter.remove("builtin_favicon").unwrap_err(),
            NoiseError::BuiltinImmutable { .. }
        ));
        assert!(matches!(
            filter.remove("user_99").unwrap_err(),
            NoiseError::RuleNotFound { .. }
        ));
    }

    #[test]
    fn test_remove_user_rule() {
        let filter = NoiseFilter::new();
        filter
            .add(vec![console_rule(MatchSpec {
                message_pattern: Some("x".to_string()),
                ..Default::default()
            })])
            .unwrap();
        let before = filter.rule_count();
        filter.remove("user_1").unwrap();
        assert_eq!(filter.rule_count(), before - 1);
    }

    #[test]
    fn test_reset_restores_builtins_and_zeroes_stats() {
        let filter = NoiseFilter::new();
        let builtin_count = filter.rule_count();
        filter
            .add(vec![console_rule(MatchSpec {
                message_pattern: Some("x".to_string()),
                ..Default::default()
            })])
            .unwrap();
        filter.is_console_noise(&LogEntry::new("info", "x", ""));
        assert!(filter.get_statistics().total_filtered > 0);

        filter.reset();
        assert_eq!(filter.rule_count(), builtin_count);
        let stats = filter.get_statistics();
        assert_eq!(stats.total_filtered, 0);
        assert!(stats.per_rule.is_empty());

        // Counter restarts at zero: the next add is user_1 again.
        filter
            .add(vec![console_rule(MatchSpec {
                message_pattern: Some("y".to_string()),
                ..Default::default()
            })])
            .unwrap();
        assert!(filter.list().iter().any(|r| r.id == "user_1"));
    }

    #[test]
    fn test_reset_twice_same_state() {
        let filter = NoiseFilter::new();
        filter.reset();
        let first: Vec<String> = filter.list().into_iter().map(|r| r.id).collect();
        filter.reset();
        let second: Vec<String> = filter.list().into_iter().map(|r| r.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_dismiss_noise_creates_dismiss_rule() {
        let filter = NoiseFilter::new();
        filter
            .dismiss_noise("spinner mounted", RuleCategory::Console, "cosmetic chatter")
            .unwrap();
        let rule = filter
            .list()
            .into_iter()
            .find(|r| r.id == "dismiss_1")
            .expect("dismiss rule present");
        assert_eq!(rule.classification, Classification::Dismissed);
        assert_eq!(rule.matcher.message_pattern.as_deref(), Some("spinner mounted"));
        assert!(filter.is_console_noise(&LogEntry::new("info", "spinner mounted", "")));
    }

    #[test]
    fn test_statistics_track_signal_and_noise() {
        let filter = NoiseFilter::new();
        assert!(!filter.is_console_noise(&LogEntry::new("error", "real failure", "app.js:1")));
        let stats = filter.get_statistics();
        assert!(stats.last_signal_at.is_some());
        assert!(stats.last_noise_at.is_none());

        filter.is_console_noise(&LogEntry::new("info", "[HMR] rebuilt", ""));
        let stats = filter.get_statistics();
        assert_eq!(stats.total_filtered, 1);
        assert!(stats.last_noise_at.is_some());
    }

    #[test]
    fn test_invalid_persisted_style_pattern_never_matches() {
        // A rule whose pattern has invalid syntax passes validation shape
        // checks only at compile time; the compiled predicate is None and
        // the rule never matches.
        let filter = NoiseFilter::new();
        filter
            .add(vec![console_rule(MatchSpec {
                message_pattern: Some("[unclosed".to_string()),
                ..Default::default()
            })])
            .unwrap();
        assert!(!filter.is_console_noise(&LogEntry::new("info", "[unclosed", "")));
    }
}
