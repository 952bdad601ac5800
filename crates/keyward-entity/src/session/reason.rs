//! Session revocation reasons.

use serde::{Deserialize, Serialize};

/// Why a session was revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "revoked_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RevokedReason {
    /// Password changed from outside any session.
    PasswordChangedAllSessions,
    /// Password changed from one session; the others are revoked.
    PasswordChangedOtherSessions,
    /// User or admin logged the session out.
    ManuallyRevoked,
    /// Flagged by a risk check.
    SuspiciousActivity,
    /// Forced logout by an admin.
    ForceLogout,
    /// The owning account was blocked.
    UserBlocked,
    /// Pruned because the user holds too many sessions.
    SessionLimitExceeded,
}

labelled!(RevokedReason, "revocation reason", {
    PasswordChangedAllSessions => "password_changed_all_sessions",
    PasswordChangedOtherSessions => "password_changed_other_sessions",
    ManuallyRevoked => "manually_revoked",
    SuspiciousActivity => "suspicious_activity",
    ForceLogout => "force_logout",
    UserBlocked => "user_blocked",
    SessionLimitExceeded => "session_limit_exceeded",
});

impl RevokedReason {
    /// The reason recorded when a password change revokes sessions.
    pub fn for_password_change(has_current_session: bool) -> Self {
        if has_current_session {
            Self::PasswordChangedOtherSessions
        } else {
            Self::PasswordChangedAllSessions
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_change_reason() {
        assert_eq!(
            RevokedReason::for_password_change(true),
            RevokedReason::PasswordChangedOtherSessions
        );
        assert_eq!(
            RevokedReason::for_password_change(false),
            RevokedReason::PasswordChangedAllSessions
        );
    }

    #[test]
    fn test_parse_matches_display() {
        let reason: RevokedReason = "force_logout".parse().unwrap();
        assert_eq!(reason.to_string(), "force_logout");
        assert!("logged_out".parse::<RevokedReason>().is_err());
    }
}
