//! Checkpoint-manager errors.

/// Errors that can occur when creating checkpoints.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint name cannot be empty")]
    EmptyName,

    #[error("checkpoint name too long: {len} chars (max {max})")]
    NameTooLong { len: usize, max: usize },
}
