//! Audit trail capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// A single security-relevant action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Who performed the action (`None` for the system).
    pub actor_id: Option<uuid::Uuid>,
    /// Email of the acting identity, if any.
    pub actor_email: Option<String>,
    /// Coarse grouping, e.g. `"sanction"`.
    pub category: String,
    /// What happened, e.g. `"block_user"`.
    pub action: String,
    /// Free-form details.
    pub metadata: serde_json::Value,
}

/// Records audit entries. Best-effort: callers log and ignore failures.
#[async_trait]
pub trait AuditLogger: Send + Sync + std::fmt::Debug + 'static {
    /// Persist one entry.
    async fn record(&self, entry: AuditEntry) -> AppResult<()>;
}
