//! Regex safety validation.
//!
//! Rejects patterns long enough or structured enough to risk catastrophic
//! backtracking in downstream engines. Patterns with invalid regex syntax
//! are accepted here and skipped at compile time instead, so rules persisted
//! by older versions keep loading.

use std::sync::OnceLock;

use regex::Regex;

use crate::constants::MAX_PATTERN_LENGTH;
use crate::errors::NoiseError;

/// Matches nested quantifier shapes such as `(a+)+`, `(b*)*`, `(c?)?`, and
/// `(d{2,5})+`.
fn nested_quantifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[+*?}]\s*\)?\s*[+*?]").expect("nested quantifier pattern compiles"))
}

/// Validate a user-supplied pattern. Empty patterns are accepted.
pub fn validate_regex_pattern(pattern: &str) -> Result<(), NoiseError> {
    if pattern.len() > MAX_PATTERN_LENGTH {
        return Err(NoiseError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: format!("pattern exceeds {MAX_PATTERN_LENGTH} chars"),
        });
    }
    if nested_quantifier_re().is_match(pattern) {
        return Err(NoiseError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "nested quantifiers are not allowed".to_string(),
        });
    }
    Ok(())
}
