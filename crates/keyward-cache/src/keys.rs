//! Key builders for every ephemeral entry Keyward writes.
//!
//! The blacklist layout is shared with other services that read it, so
//! these formats must not change.

use uuid::Uuid;

// ── Blacklist keys ─────────────────────────────────────────

/// Permanent blacklist entry for a refresh token.
pub fn blacklist_refresh(token: &str) -> String {
    format!("blacklist:refresh:{token}")
}

/// Short-lived blacklist entry written while a refresh token rotates.
pub fn temp_blacklist_refresh(token: &str) -> String {
    format!("temp_blacklist:refresh:{token}")
}

/// Both blacklist keys for a token, permanent first.
pub fn blacklist_pair(token: &str) -> [String; 2] {
    [blacklist_refresh(token), temp_blacklist_refresh(token)]
}

// ── Two-factor keys ────────────────────────────────────────

/// Resend-cooldown marker for a user's one-time code.
pub fn two_factor_resend(user_id: Uuid) -> String {
    format!("two_factor:resend:{user_id}")
}

/// Hourly issuance counter for a user's one-time codes.
pub fn two_factor_issued(user_id: Uuid) -> String {
    format!("two_factor:issued:{user_id}")
}
