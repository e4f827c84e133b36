//! Noise rule model and compiled form.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use beacon_core::regex_guard::validate_regex_pattern;
use beacon_core::{FxHashMap, NoiseError};

/// Id prefix for built-in rules; these are immutable and never persisted.
pub const BUILTIN_PREFIX: &str = "builtin_";

/// Telemetry kind a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Console,
    Network,
    Websocket,
}

/// Why an entry counts as noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Extension,
    Framework,
    Cosmetic,
    Analytics,
    Infrastructure,
    Repetitive,
    Dismissed,
}

/// Predicates of a rule. Regex fields OR together; the scalar gates (level,
/// method, status range) AND against them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSpec {
    /// Regex over the request / socket URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    /// Regex over the console message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_pattern: Option<String>,
    /// Regex over the console source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_pattern: Option<String>,
    /// Exact HTTP method gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Minimum status (inclusive); 0 disables the gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_min: Option<u16>,
    /// Maximum status (inclusive); 0 disables the gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_max: Option<u16>,
    /// Exact console level gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl MatchSpec {
    /// Whether a URL pattern is set (non-empty).
    pub fn has_url_pattern(&self) -> bool {
        self.url_pattern.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Whether the method gate is active.
    pub fn has_method(&self) -> bool {
        self.method.as_deref().is_some_and(|m| !m.is_empty())
    }

    /// Whether the minimum-status gate is active.
    pub fn has_status_min(&self) -> bool {
        self.status_min.is_some_and(|v| v > 0)
    }
}

/// A noise classification rule. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseRule {
    /// `builtin_*`, `user_N`, `dismiss_N`, or `auto_N`.
    pub id: String,
    pub category: RuleCategory,
    pub classification: Classification,
    #[serde(rename = "match")]
    pub matcher: MatchSpec,
    /// Whether the rule was proposed by auto-detection.
    #[serde(default)]
    pub auto_detected: bool,
    pub created_at: DateTime<Utc>,
    /// Human-readable justification.
    #[serde(default)]
    pub reason: String,
}

impl NoiseRule {
    pub fn is_builtin(&self) -> bool {
        self.id.starts_with(BUILTIN_PREFIX)
    }

    /// Validate all set patterns against the regex safety guard.
    pub fn validate(&self) -> Result<(), NoiseError> {
        for pattern in [
            self.matcher.url_pattern.as_deref(),
            self.matcher.message_pattern.as_deref(),
            self.matcher.source_pattern.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            validate_regex_pattern(pattern)?;
        }
        Ok(())
    }
}

/// A rule with its patterns pre-compiled. A pattern that fails to compile
/// leaves `None`: that predicate never matches and the rule is retained.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: NoiseRule,
    pub url_re: Option<Regex>,
    pub message_re: Option<Regex>,
    pub source_re: Option<Regex>,
}

impl CompiledRule {
    pub fn compile(rule: NoiseRule) -> Self {
        let url_re = compile_field(rule.matcher.url_pattern.as_deref(), &rule.id, "url");
        let message_re = compile_field(rule.matcher.message_pattern.as_deref(), &rule.id, "message");
        let source_re = compile_field(rule.matcher.source_pattern.as_deref(), &rule.id, "source");
        Self {
            rule,
            url_re,
            message_re,
            source_re,
        }
    }

    /// True when every set (non-empty) pattern compiled.
    pub fn fully_compiled(&self) -> bool {
        let spec = &self.rule.matcher;
        let field_ok = |pattern: Option<&str>, re: &Option<Regex>| match pattern {
            Some(p) if !p.is_empty() => re.is_some(),
            _ => true,
        };
        field_ok(spec.url_pattern.as_deref(), &self.url_re)
            && field_ok(spec.message_pattern.as_deref(), &self.message_re)
            && field_ok(spec.source_pattern.as_deref(), &self.source_re)
    }
}

fn compile_field(pattern: Option<&str>, rule_id: &str, field: &str) -> Option<Regex> {
    let pattern = pattern?;
    if pattern.is_empty() {
        return None;
    }
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!("noise: rule {rule_id} {field} pattern failed to compile: {err}");
            None
        }
    }
}

/// Filter statistics. `per_rule` counts matches per rule id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseStatistics {
    pub total_filtered: u64,
    pub per_rule: FxHashMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_signal_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_noise_at: Option<DateTime<Utc>>,
}
