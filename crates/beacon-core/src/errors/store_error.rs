//! Session-store errors for filesystem KV operations.

/// Errors that can occur in the session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid {label}: {reason}")]
    InvalidInput { label: String, reason: String },

    #[error("file too large: {size} bytes (max {max})")]
    FileTooLarge { size: u64, max: u64 },

    #[error("project size limit exceeded: {current} bytes used (max {max})")]
    ProjectSizeExceeded { current: u64, max: u64 },

    #[error("key not found: {namespace}/{key}")]
    KeyNotFound { namespace: String, key: String },

    #[error("io error: {message}")]
    Io { message: String },
}

impl StoreError {
    /// Wrap a std io error.
    pub fn io(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}
