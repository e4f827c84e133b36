//! Noise-filter errors.

/// Errors that can occur in the noise filter.
#[derive(Debug, thiserror::Error)]
pub enum NoiseError {
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("rule not found: {id}")]
    RuleNotFound { id: String },

    #[error("cannot remove built-in rule: {id}")]
    BuiltinImmutable { id: String },
}
