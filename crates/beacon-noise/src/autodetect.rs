//! Auto-detection of new noise patterns from current buffer contents.
//!
//! Three passes run over the buffers and their proposals are concatenated:
//! repetitive console messages, `node_modules` console sources, and
//! infrastructure URL paths. Proposals at or above the auto-apply
//! confidence are applied by the filter in the same call.

use chrono::Utc;

use beacon_core::{extract_url_path, FxHashMap, LogEntry, NetworkBody};

use crate::rules::{Classification, CompiledRule, MatchSpec, NoiseRule, RuleCategory};

/// Proposals at or above this confidence are applied immediately.
pub const AUTO_APPLY_CONFIDENCE: f64 = 0.9;

/// Minimum identical console messages before proposing a repetitive rule.
const REPETITIVE_MESSAGE_THRESHOLD: usize = 10;
/// Minimum entries from one `node_modules` source before proposing.
const NODE_MODULES_THRESHOLD: usize = 2;
/// Minimum hits on one URL path before proposing an infrastructure rule.
const INFRASTRUCTURE_URL_THRESHOLD: usize = 20;

/// Path fragments that mark infrastructure endpoints.
const INFRASTRUCTURE_MARKERS: [&str; 6] = ["/health", "/ping", "/ready", "/__", "/sockjs-node", "/ws"];

/// A proposed noise rule with supporting evidence.
#[derive(Debug, Clone)]
pub struct RuleProposal {
    pub category: RuleCategory,
    pub classification: Classification,
    pub matcher: MatchSpec,
    /// 0.0–0.99; ≥ 0.9 auto-applies.
    pub confidence: f64,
    /// Matching entries observed in the analysed buffers.
    pub sample_count: usize,
    pub reason: String,
}

impl RuleProposal {
    /// Materialise the proposal as a rule with the given id.
    pub fn to_rule(&self, id: String) -> NoiseRule {
        NoiseRule {
            id,
            category: self.category,
            classification: self.classification,
            matcher: self.matcher.clone(),
            auto_detected: true,
            created_at: Utc::now(),
            reason: self.reason.clone(),
        }
    }
}

/// Run all passes against the buffers.
pub(crate) fn analyze(
    existing: &[CompiledRule],
    console: &[LogEntry],
    network: &[NetworkBody],
) -> Vec<RuleProposal> {
    let mut proposals = detect_repetitive_messages(existing, console);
    proposals.extend(detect_node_modules_sources(existing, console));
    proposals.extend(detect_infrastructure_urls(existing, network));
    proposals
}

/// Group console entries by exact message; large groups not covered by an
/// existing rule become repetitive-noise proposals.
fn detect_repetitive_messages(existing: &[CompiledRule], console: &[LogEntry]) -> Vec<RuleProposal> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: FxHashMap<&str, Vec<&LogEntry>> = FxHashMap::default();
    for entry in console {
        if entry.message.is_empty() {
            continue;
        }
        groups
            .entry(entry.message.as_str())
            .or_insert_with(|| {
                order.push(entry.message.as_str());
                Vec::new()
            })
            .push(entry);
    }

    let mut proposals = Vec::new();
    for message in order {
        let group = &groups[message];
        if group.len() < REPETITIVE_MESSAGE_THRESHOLD {
            continue;
        }
        if message_covered(existing, message, group) {
            continue;
        }
        let confidence = (0.7 + group.len() as f64 / 100.0).min(0.99);
        proposals.push(RuleProposal {
            category: RuleCategory::Console,
            classification: Classification::Repetitive,
            matcher: MatchSpec {
                message_pattern: Some(regex::escape(message)),
                ..Default::default()
            },
            confidence,
            sample_count: group.len(),
            reason: format!("Identical message repeated {} times", group.len()),
        });
    }
    proposals
}

/// A message group is covered when an existing console rule matches the
/// message itself or the source of any entry in the group.
fn message_covered(existing: &[CompiledRule], message: &str, group: &[&LogEntry]) -> bool {
    existing.iter().any(|compiled| {
        if compiled.rule.category != RuleCategory::Console {
            return false;
        }
        if compiled
            .message_re
            .as_ref()
            .is_some_and(|re| re.is_match(message))
        {
            return true;
        }
        compiled.source_re.as_ref().is_some_and(|re| {
            group.iter().any(|entry| re.is_match(&entry.source))
        })
    })
}

/// Group console entries by `node_modules` source.
fn detect_node_modules_sources(existing: &[CompiledRule], console: &[LogEntry]) -> Vec<RuleProposal> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for entry in console {
        if !entry.source.contains("node_modules") {
            continue;
        }
        let count = counts.entry(entry.source.as_str()).or_insert_with(|| {
            order.push(entry.source.as_str());
            0
        });
        *count += 1;
    }

    let mut proposals = Vec::new();
    for source in order {
        let count = counts[source];
        if count < NODE_MODULES_THRESHOLD {
            continue;
        }
        if source_covered(existing, source) {
            continue;
        }
        proposals.push(RuleProposal {
            category: RuleCategory::Console,
            classification: Classification::Extension,
            matcher: MatchSpec {
                source_pattern: Some(regex::escape(source)),
                ..Default::default()
            },
            confidence: 0.75,
            sample_count: count,
            reason: format!("{count} entries from dependency source {source}"),
        });
    }
    proposals
}

fn source_covered(existing: &[CompiledRule], source: &str) -> bool {
    existing.iter().any(|compiled| {
        compiled.rule.category == RuleCategory::Console
            && compiled
                .source_re
                .as_ref()
                .is_some_and(|re| re.is_match(source))
    })
}

/// Count network hits per URL path; heavily polled infrastructure paths
/// become proposals.
fn detect_infrastructure_urls(existing: &[CompiledRule], network: &[NetworkBody]) -> Vec<RuleProposal> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: FxHashMap<String, usize> = FxHashMap::default();
    for body in network {
        let path = extract_url_path(&body.url);
        let count = counts.entry(path.clone()).or_insert_with(|| {
            order.push(path);
            0
        });
        *count += 1;
    }

    let mut proposals = Vec::new();
    for path in order {
        let count = counts[&path];
        if count < INFRASTRUCTURE_URL_THRESHOLD {
            continue;
        }
        if !INFRASTRUCTURE_MARKERS.iter().any(|m| path.contains(m)) {
            continue;
        }
        if url_covered(existing, &path) {
            continue;
        }
        proposals.push(RuleProposal {
            category: RuleCategory::Network,
            classification: Classification::Infrastructure,
            matcher: MatchSpec {
                url_pattern: Some(regex::escape(&path)),
                ..Default::default()
            },
            confidence: 0.8,
            sample_count: count,
            reason: format!("{count} requests to infrastructure path {path}"),
        });
    }
    proposals
}

fn url_covered(existing: &[CompiledRule], path: &str) -> bool {
    existing.iter().any(|compiled| {
        compiled.rule.category == RuleCategory::Network
            && compiled.url_re.as_ref().is_some_and(|re| re.is_match(path))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::builtin_rules;

    fn compiled_builtins() -> Vec<CompiledRule> {
        builtin_rules().into_iter().map(CompiledRule::compile).collect()
    }

    fn repeated_logs(message: &str, count: usize) -> Vec<LogEntry> {
        (0..count)
            .map(|_| LogEntry::new("info", message, "app.js:1"))
            .collect()
    }

    #[test]
    fn test_repetitive_messages_proposed_with_scaled_confidence() {
        let console = repeated_logs("poll tick", 12);
        let proposals = analyze(&compiled_builtins(), &console, &[]);
        assert_eq!(proposals.len(), 1);
        let p = &proposals[0];
        assert_eq!(p.classification, Classification::Repetitive);
        assert_eq!(p.sample_count, 12);
        assert!((p.confidence - 0.82).abs() < 1e-9);
        assert_eq!(p.matcher.message_pattern.as_deref(), Some("poll tick"));
    }

    #[test]
    fn test_repetitive_confidence_capped() {
        let console = repeated_logs("tick", 500);
        let proposals = analyze(&compiled_builtins(), &console, &[]);
        assert_eq!(proposals[0].confidence, 0.99);
    }

    #[test]
    fn test_below_threshold_not_proposed() {
        let console = repeated_logs("sometimes", 9);
        assert!(analyze(&compiled_builtins(), &console, &[]).is_empty());
    }

    #[test]
    fn test_covered_messages_not_reproposed() {
        // "[HMR] rebuilt" is covered by the built-in HMR rule.
        let console = repeated_logs("[HMR] rebuilt", 30);
        assert!(analyze(&compiled_builtins(), &console, &[]).is_empty());
    }

    #[test]
    fn test_node_modules_sources_proposed() {
        let console: Vec<LogEntry> = (0..3)
            .map(|i| {
                LogEntry::new(
                    "warn",
                    format!("dep warning {i}"),
                    "node_modules/some-widget/index.js:40",
                )
            })
            .collect();
        let proposals = analyze(&compiled_builtins(), &console, &[]);
        assert_eq!(proposals.len(), 1);
        let p = &proposals[0];
        assert_eq!(p.classification, Classification::Extension);
        assert_eq!(p.confidence, 0.75);
        assert_eq!(
            p.matcher.source_pattern.as_deref(),
            Some(regex::escape("node_modules/some-widget/index.js:40").as_str())
        );
    }

    #[test]
    fn test_infrastructure_url_pass() {
        let health: Vec<NetworkBody> = (0..25)
            .map(|_| NetworkBody {
                url: "https://app.test/api/health?probe=1".to_string(),
                method: "GET".to_string(),
                status: 200,
                ..Default::default()
            })
            .collect();
        let proposals = analyze(&[], &[], &health);
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].classification, Classification::Infrastructure);
        assert_eq!(proposals[0].confidence, 0.8);
        assert_eq!(proposals[0].matcher.url_pattern.as_deref(), Some("/api/health"));

        // High volume on a non-marker path proposes nothing.
        let plain: Vec<NetworkBody> = (0..25)
            .map(|_| NetworkBody {
                url: "https://app.test/api/orders".to_string(),
                method: "GET".to_string(),
                status: 200,
                ..Default::default()
            })
            .collect();
        assert!(analyze(&[], &[], &plain).is_empty());
    }
}
