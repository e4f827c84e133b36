//! Project metadata and its lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-project metadata persisted at `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    /// Stable project identifier (hash of the project path).
    pub project_id: String,
    /// Absolute project path as supplied by the caller.
    pub project_path: String,
    /// When the project directory was first created.
    pub first_created: DateTime<Utc>,
    /// Start of the most recent session.
    pub last_session: DateTime<Utc>,
    /// Number of sessions opened against this project.
    pub session_count: u64,
}

impl ProjectMeta {
    /// Fresh metadata for a project seen for the first time.
    pub fn fresh(project_id: &str, project_path: &str) -> Self {
        let now = Utc::now();
        Self {
            project_id: project_id.to_string(),
            project_path: project_path.to_string(),
            first_created: now,
            last_session: now,
            session_count: 1,
        }
    }

    /// Fold a new session into existing metadata.
    pub fn begin_session(&mut self) {
        self.session_count += 1;
        self.last_session = Utc::now();
    }
}
