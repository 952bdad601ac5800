//! Lifts blocks whose expiry has passed.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use keyward_auth::SanctionCascade;
use keyward_core::result::AppResult;

use super::ScheduledJob;

/// Unblocks users whose block lapsed while nobody looked them up.
#[derive(Debug)]
pub struct SanctionExpirySweepJob {
    sanctions: Arc<SanctionCascade>,
    schedule: String,
}

impl SanctionExpirySweepJob {
    /// Job name.
    pub const NAME: &'static str = "sanction_expiry_sweep";

    /// Create the job.
    pub fn new(sanctions: Arc<SanctionCascade>, schedule: String) -> Self {
        Self {
            sanctions,
            schedule,
        }
    }
}

#[async_trait]
impl ScheduledJob for SanctionExpirySweepJob {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schedule(&self) -> &str {
        &self.schedule
    }

    async fn run(&self) -> AppResult<Value> {
        let unblocked = self.sanctions.auto_unblock_expired_sanctions().await?;
        Ok(json!({ "task": Self::NAME, "unblocked_users": unblocked }))
    }
}
