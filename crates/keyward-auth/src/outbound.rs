//! Default collaborators that report through `tracing`.

use async_trait::async_trait;
use tracing::info;

use keyward_core::result::AppResult;
use keyward_core::traits::{AuditEntry, AuditLogger, Notifier};

/// Notifier that logs each delivery instead of sending it.
///
/// The payload is not logged: it carries the one-time code.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(
        &self,
        destination: &str,
        template_id: &str,
        _data: serde_json::Value,
    ) -> AppResult<()> {
        info!(target: "keyward::notify", destination, template_id, "Notification dispatched");
        Ok(())
    }
}

/// Audit logger that emits each entry as a structured event.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditLogger;

#[async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn record(&self, entry: AuditEntry) -> AppResult<()> {
        info!(
            target: "keyward::audit",
            actor_id = ?entry.actor_id,
            actor_email = entry.actor_email.as_deref().unwrap_or("system"),
            category = %entry.category,
            action = %entry.action,
            metadata = %entry.metadata,
            "Audit"
        );
        Ok(())
    }
}
