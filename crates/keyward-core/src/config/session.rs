//! Session management configuration.

use serde::{Deserialize, Serialize};

/// Session management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of non-revoked sessions a user may hold. Older
    /// sessions beyond this count are revoked on login.
    #[serde(default = "default_max_sessions")]
    pub max_sessions_per_user: u32,
    /// Revoked sessions older than this many days are purged by the
    /// cleanup job.
    #[serde(default = "default_retention_days")]
    pub cleanup_retention_days: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_user: default_max_sessions(),
            cleanup_retention_days: default_retention_days(),
        }
    }
}

fn default_max_sessions() -> u32 {
    5
}

fn default_retention_days() -> u32 {
    30
}
