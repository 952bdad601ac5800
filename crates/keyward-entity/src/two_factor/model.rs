//! Per-user one-time code state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row per user. At most one code is outstanding at a time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TwoFactorSecurity {
    /// Owning user.
    pub user_id: Uuid,
    /// Hash of the outstanding code, if any.
    #[serde(skip_serializing)]
    pub code_hash: Option<String>,
    /// When the outstanding code stops being accepted.
    pub code_expires_at: Option<DateTime<Utc>>,
    /// Wrong guesses against the outstanding code. Never negative.
    pub attempts: i32,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

impl TwoFactorSecurity {
    /// Whether a code has been issued and not yet consumed or cleared.
    pub fn has_outstanding_code(&self) -> bool {
        self.code_hash.is_some()
    }

    /// Whether the outstanding code has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.code_expires_at.is_none_or(|exp| exp <= now)
    }

    /// Whether the attempt ceiling has been reached.
    pub fn is_locked(&self, max_attempts: i32) -> bool {
        self.attempts >= max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(attempts: i32, expires_in: Option<Duration>) -> TwoFactorSecurity {
        let now = Utc::now();
        TwoFactorSecurity {
            user_id: Uuid::new_v4(),
            code_hash: Some("h".into()),
            code_expires_at: expires_in.map(|d| now + d),
            attempts,
            updated_at: now,
        }
    }

    #[test]
    fn test_lock_threshold() {
        assert!(!record(9, None).is_locked(10));
        assert!(record(10, None).is_locked(10));
    }

    #[test]
    fn test_missing_expiry_counts_as_expired() {
        let now = Utc::now();
        assert!(record(0, None).is_expired(now));
        assert!(!record(0, Some(Duration::minutes(5))).is_expired(now));
    }
}
