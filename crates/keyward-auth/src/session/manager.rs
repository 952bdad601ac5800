//! Session lifecycle manager: upsert, pruning, revocation and cleanup.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::traits::Clock;
use keyward_database::repositories::SessionRepository;
use keyward_entity::session::{DeviceInfo, RevokedReason, Session};

use crate::blacklist::BlacklistGateway;

/// Result of a bulk invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationOutcome {
    /// Sessions revoked by this call.
    pub invalidated_count: usize,
}

/// Orchestrates session records and their blacklist entries.
///
/// Every operation commits to the durable store before touching the
/// blacklist, so a blacklist entry never exists for a session that is
/// still live.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<dyn SessionRepository>,
    blacklist: Arc<BlacklistGateway>,
    clock: Arc<dyn Clock>,
    max_sessions: u32,
    /// Lifetime of a refresh token; the longest a blacklist entry for one
    /// is useful.
    refresh_ttl: Duration,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("max_sessions", &self.max_sessions)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl SessionManager {
    /// Creates a new session manager.
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        blacklist: Arc<BlacklistGateway>,
        clock: Arc<dyn Clock>,
        max_sessions: u32,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            sessions,
            blacklist,
            clock,
            max_sessions,
            refresh_ttl,
        }
    }

    /// Configured per-user session cap.
    pub fn max_sessions(&self) -> u32 {
        self.max_sessions
    }

    /// The blacklist this manager writes to.
    pub fn blacklist(&self) -> &Arc<BlacklistGateway> {
        &self.blacklist
    }

    /// Creates or refreshes the session for `(user_id, device)`:
    ///
    /// 1. Atomic upsert keyed by the device identity
    /// 2. Prune the user's sessions down to the cap
    ///
    /// The upserted session is the most recently used, so pruning never
    /// revokes it.
    pub async fn create_or_update_session(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        device: &DeviceInfo,
    ) -> AppResult<Session> {
        let now = self.clock.now();
        let session = self
            .sessions
            .upsert(user_id, refresh_token, device, now)
            .await?;

        info!(
            user_id = %user_id,
            session_id = %session.id,
            device_type = device.device_type.as_deref().unwrap_or("unknown"),
            "Session created or refreshed"
        );

        self.prune_sessions(user_id, self.max_sessions).await?;
        Ok(session)
    }

    /// Revokes every live session beyond the `max_sessions` most recently
    /// used and blacklists their refresh tokens. Returns how many were
    /// revoked.
    pub async fn prune_sessions(&self, user_id: Uuid, max_sessions: u32) -> AppResult<usize> {
        let revoked = self
            .sessions
            .revoke_excess(
                user_id,
                max_sessions,
                RevokedReason::SessionLimitExceeded,
                self.clock.now(),
            )
            .await?;

        if revoked.is_empty() {
            return Ok(0);
        }

        info!(
            user_id = %user_id,
            count = revoked.len(),
            max_sessions,
            "Pruned sessions over the per-user limit"
        );
        self.blacklist
            .bulk_add_with_ttl(&refresh_tokens(&revoked), self.refresh_ttl)
            .await;
        Ok(revoked.len())
    }

    /// Revokes every live session of a user except `current_session_id`
    /// (used after a password change). Idempotent: a second call finds
    /// nothing to revoke.
    pub async fn invalidate_all_except_current(
        &self,
        user_id: Uuid,
        current_session_id: Option<Uuid>,
    ) -> AppResult<InvalidationOutcome> {
        let reason = RevokedReason::for_password_change(current_session_id.is_some());
        let revoked = self
            .sessions
            .revoke_all_for_user(user_id, current_session_id, reason, self.clock.now())
            .await?;

        if !revoked.is_empty() {
            self.blacklist
                .bulk_add_with_ttl(&refresh_tokens(&revoked), self.refresh_ttl)
                .await;
        }

        info!(
            user_id = %user_id,
            count = revoked.len(),
            reason = %reason,
            "Invalidated sessions"
        );
        Ok(InvalidationOutcome {
            invalidated_count: revoked.len(),
        })
    }

    /// Revokes one session and blacklists its refresh token.
    ///
    /// The blacklist write is on the critical path: if it fails after
    /// retries the error reaches the caller, although the durable
    /// revocation has already committed.
    pub async fn invalidate_specific_session(
        &self,
        session_id: Uuid,
        reason: RevokedReason,
    ) -> AppResult<Session> {
        let session = self
            .sessions
            .revoke(session_id, reason, self.clock.now())
            .await?
            .ok_or_else(|| AppError::not_found(format!("Session {session_id} not found")))?;

        self.blacklist
            .add(&session.refresh_token, self.refresh_ttl)
            .await?;

        info!(
            user_id = %session.user_id,
            session_id = %session_id,
            reason = %session.revoked_reason.unwrap_or(reason),
            "Session invalidated"
        );
        Ok(session)
    }

    /// Revokes every live session of a user with `reason` and blacklists
    /// them for `ttl`. Blacklist failures are logged, not returned.
    pub async fn revoke_user_sessions(
        &self,
        user_id: Uuid,
        reason: RevokedReason,
        ttl: Duration,
    ) -> AppResult<usize> {
        let revoked = self
            .sessions
            .revoke_all_for_user(user_id, None, reason, self.clock.now())
            .await?;

        if !revoked.is_empty() {
            let written = self
                .blacklist
                .bulk_add_with_ttl(&refresh_tokens(&revoked), ttl)
                .await;
            if written < revoked.len() {
                warn!(
                    user_id = %user_id,
                    revoked = revoked.len(),
                    written,
                    "Some revoked sessions were not blacklisted"
                );
            }
        }
        Ok(revoked.len())
    }

    /// Removes every session token of a user, revoked or not, from the
    /// blacklist. Returns how many blacklist keys were removed.
    pub async fn unblacklist_user_sessions(&self, user_id: Uuid) -> AppResult<u64> {
        let sessions = self.sessions.find_all_by_user(user_id).await?;
        if sessions.is_empty() {
            return Ok(0);
        }
        Ok(self.blacklist.bulk_remove(&refresh_tokens(&sessions)).await)
    }

    /// Hard-deletes every session of a user and purges their tokens from
    /// the blacklist. Returns how many sessions were deleted.
    pub async fn delete_all_user_sessions(&self, user_id: Uuid) -> AppResult<usize> {
        let deleted = self.sessions.delete_all_for_user(user_id).await?;
        if !deleted.is_empty() {
            self.blacklist.bulk_remove(&refresh_tokens(&deleted)).await;
        }
        info!(user_id = %user_id, count = deleted.len(), "Deleted all user sessions");
        Ok(deleted.len())
    }

    /// Deletes sessions revoked more than `retention_days` ago and purges
    /// their tokens from the blacklist. Returns how many were deleted.
    pub async fn cleanup_revoked_sessions(&self, retention_days: u32) -> AppResult<usize> {
        let cutoff = self.clock.now() - ChronoDuration::days(i64::from(retention_days));
        let deleted = self.sessions.delete_revoked_before(cutoff).await?;
        if !deleted.is_empty() {
            self.blacklist.bulk_remove(&refresh_tokens(&deleted)).await;
        }
        info!(
            count = deleted.len(),
            retention_days,
            "Cleaned up revoked sessions"
        );
        Ok(deleted.len())
    }

    /// Number of live sessions a user holds.
    pub async fn get_active_sessions_count(&self, user_id: Uuid) -> AppResult<i64> {
        self.sessions.count_active_by_user(user_id).await
    }

    /// A user's live sessions, most recently used first.
    pub async fn get_user_active_sessions(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        self.sessions.find_active_by_user(user_id).await
    }

    /// Every session of a user, revoked included.
    pub async fn get_user_sessions(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        self.sessions.find_all_by_user(user_id).await
    }

    /// The session currently bound to `refresh_token`.
    pub async fn find_by_refresh_token(&self, refresh_token: &str) -> AppResult<Option<Session>> {
        self.sessions.find_by_refresh_token(refresh_token).await
    }

    /// Swap a session's refresh token if it still holds `old_token`.
    pub async fn rotate_refresh_token(
        &self,
        session_id: Uuid,
        old_token: &str,
        new_token: &str,
    ) -> AppResult<bool> {
        self.sessions
            .rotate_refresh_token(session_id, old_token, new_token, self.clock.now())
            .await
    }
}

fn refresh_tokens(sessions: &[Session]) -> Vec<String> {
    sessions.iter().map(|s| s.refresh_token.clone()).collect()
}
