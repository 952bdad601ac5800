use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::role::UserRole;
use super::status::UserStatus;

/// Identity root. Created at registration, never deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    /// Login and notification address.
    pub email: String,
    /// Opaque credential hash, only read by the credential verifier.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    /// Set while blocked. Permanent blocks get a deadline years out.
    pub blocked_until: Option<DateTime<Utc>>,
    /// Whether login requires an emailed one-time code.
    pub two_factor_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_blocked(&self) -> bool {
        self.status == UserStatus::Blocked
    }

    /// Blocked, but the deadline has passed and nobody has lifted it yet.
    pub fn block_has_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.is_blocked() && self.blocked_until.is_some_and(|until| until <= now)
    }
}

/// Registration input; the hash is produced by the credential verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    /// Pre-computed credential hash.
    pub password_hash: String,
    /// Initial role.
    pub role: UserRole,
    /// Whether 2FA is required at login.
    pub two_factor_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(status: UserStatus, blocked_until: Option<DateTime<Utc>>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            password_hash: String::new(),
            role: UserRole::User,
            status,
            blocked_until,
            two_factor_enabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_block_lapse() {
        let now = Utc::now();
        assert!(user(UserStatus::Blocked, Some(now - Duration::seconds(1))).block_has_lapsed(now));
        assert!(!user(UserStatus::Blocked, Some(now + Duration::hours(1))).block_has_lapsed(now));
        assert!(!user(UserStatus::Active, Some(now - Duration::hours(1))).block_has_lapsed(now));
    }
}
