//! Deletes long-revoked sessions and their blacklist entries.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use keyward_auth::SessionManager;
use keyward_core::result::AppResult;

use super::ScheduledJob;

/// Purges sessions revoked more than `retention_days` ago.
#[derive(Debug)]
pub struct RevokedSessionCleanupJob {
    sessions: Arc<SessionManager>,
    retention_days: u32,
    schedule: String,
}

impl RevokedSessionCleanupJob {
    /// Job name.
    pub const NAME: &'static str = "revoked_session_cleanup";

    /// Create the job.
    pub fn new(sessions: Arc<SessionManager>, retention_days: u32, schedule: String) -> Self {
        Self {
            sessions,
            retention_days,
            schedule,
        }
    }
}

#[async_trait]
impl ScheduledJob for RevokedSessionCleanupJob {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schedule(&self) -> &str {
        &self.schedule
    }

    async fn run(&self) -> AppResult<Value> {
        info!(retention_days = self.retention_days, "Running revoked session cleanup");
        let deleted = self
            .sessions
            .cleanup_revoked_sessions(self.retention_days)
            .await?;
        Ok(json!({
            "task": Self::NAME,
            "deleted_sessions": deleted,
            "retention_days": self.retention_days,
        }))
    }
}
