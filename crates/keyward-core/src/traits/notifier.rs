//! Outbound notification capability.

use async_trait::async_trait;

use crate::result::AppResult;

/// Delivers templated messages (email, push) to a destination.
///
/// Callers treat delivery as fire-and-forget: failures are logged and
/// never abort the flow that triggered them.
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug + 'static {
    /// Send `template_id` rendered with `data` to `destination`.
    async fn send(
        &self,
        destination: &str,
        template_id: &str,
        data: serde_json::Value,
    ) -> AppResult<()>;
}
