//! Blocks placed on accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A block placed on a user. At most one sanction per user is active.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sanction {
    pub id: Uuid,
    pub user_id: Uuid,
    /// The admin who placed it (`None` for system actions).
    pub admin_id: Option<Uuid>,
    /// Free-text reason.
    pub reason: String,
    /// Whether this is the user's current sanction.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    /// When it lapses.
    pub expires_at: DateTime<Utc>,
}

/// Input to `SanctionRepository::block_user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSanction {
    pub user_id: Uuid,
    pub admin_id: Option<Uuid>,
    /// Free-text reason.
    pub reason: String,
    /// When it lapses.
    pub expires_at: DateTime<Utc>,
}
