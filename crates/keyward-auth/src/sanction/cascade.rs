//! Sanction cascade: block and unblock users, revoking or restoring their
//! sessions' blacklist state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::traits::{AuditEntry, AuditLogger, Clock};
use keyward_database::repositories::{SanctionRepository, UserRepository};
use keyward_entity::sanction::{NewSanction, Sanction};
use keyward_entity::session::RevokedReason;
use keyward_entity::user::{User, UserStatus};

use super::actor::{Actor, SystemAuthority};
use crate::session::SessionManager;

/// A block of zero hours lasts this long.
const PERMANENT_BLOCK_DAYS: i64 = 365 * 100;

const AUDIT_CATEGORY: &str = "sanction";

/// Parameters of a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRequest {
    /// Block length in hours; `0` blocks permanently.
    pub duration_hours: u64,
    /// Free-text reason.
    pub reason: String,
}

impl BlockRequest {
    /// Whether this block has no end.
    pub fn is_permanent(&self) -> bool {
        self.duration_hours == 0
    }
}

/// A user's block state as reported to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStatus {
    /// Account status after any lazy expiry.
    pub status: UserStatus,
    /// When the block lapses.
    pub blocked_until: Option<DateTime<Utc>>,
    /// The active sanction, if blocked.
    pub sanction: Option<Sanction>,
}

impl BlockStatus {
    /// Whether the account is blocked.
    pub fn is_blocked(&self) -> bool {
        self.status == UserStatus::Blocked
    }
}

/// Blocks and unblocks users.
///
/// The durable transaction always commits first. Session revocation,
/// blacklist updates and the audit record follow as best-effort steps
/// whose failures are logged but never undo the sanction.
#[derive(Clone)]
pub struct SanctionCascade {
    users: Arc<dyn UserRepository>,
    sanctions: Arc<dyn SanctionRepository>,
    sessions: Arc<SessionManager>,
    audit: Arc<dyn AuditLogger>,
    clock: Arc<dyn Clock>,
    permanent_ttl: Duration,
}

impl std::fmt::Debug for SanctionCascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanctionCascade")
            .field("permanent_ttl", &self.permanent_ttl)
            .finish()
    }
}

impl SanctionCascade {
    /// Creates a new cascade.
    pub fn new(
        users: Arc<dyn UserRepository>,
        sanctions: Arc<dyn SanctionRepository>,
        sessions: Arc<SessionManager>,
        audit: Arc<dyn AuditLogger>,
        clock: Arc<dyn Clock>,
        permanent_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sanctions,
            sessions,
            audit,
            clock,
            permanent_ttl,
        }
    }

    /// Blocks a user:
    ///
    /// 1. Check the actor may sanction the target and the duration is in range
    /// 2. In one transaction, replace prior sanctions and mark the user blocked
    /// 3. Revoke every live session and blacklist its token (best-effort)
    /// 4. Record an audit entry (best-effort)
    pub async fn block_user(
        &self,
        user_id: Uuid,
        actor: &Actor,
        request: BlockRequest,
    ) -> AppResult<Sanction> {
        let target = self.load_target(user_id).await?;
        authorize(actor, &target)?;

        let now = self.clock.now();
        let expires_at = block_deadline(now, request.duration_hours)?;

        let sanction = self
            .sanctions
            .block_user(
                NewSanction {
                    user_id,
                    admin_id: actor.id(),
                    reason: request.reason.clone(),
                    expires_at,
                },
                now,
            )
            .await?;

        info!(
            user_id = %user_id,
            actor_id = ?actor.id(),
            duration_hours = request.duration_hours,
            expires_at = %expires_at,
            "User blocked"
        );

        let ttl = if request.is_permanent() {
            self.permanent_ttl
        } else {
            Duration::from_secs(request.duration_hours.saturating_mul(3600))
        };
        match self
            .sessions
            .revoke_user_sessions(user_id, RevokedReason::UserBlocked, ttl)
            .await
        {
            Ok(count) => info!(user_id = %user_id, count, "Revoked sessions of blocked user"),
            Err(e) => error!(
                user_id = %user_id,
                error = %e,
                "Failed to revoke sessions of blocked user"
            ),
        }

        self.audit(
            actor,
            "block_user",
            json!({
                "userId": user_id,
                "reason": request.reason,
                "durationHours": request.duration_hours,
                "expiresAt": expires_at,
            }),
        )
        .await;

        Ok(sanction)
    }

    /// Unblocks a user and purges their session tokens from the blacklist
    /// so tokens issued after the unblock are not poisoned.
    pub async fn unblock_user(&self, user_id: Uuid, actor: &Actor) -> AppResult<()> {
        let target = self.load_target(user_id).await?;
        authorize(actor, &target)?;

        if !self.sanctions.unblock_user(user_id, self.clock.now()).await? {
            return Err(AppError::not_found("User not found"));
        }
        info!(user_id = %user_id, actor_id = ?actor.id(), "User unblocked");

        if let Err(e) = self.sessions.unblacklist_user_sessions(user_id).await {
            error!(
                user_id = %user_id,
                error = %e,
                "Failed to clear blacklist entries of unblocked user"
            );
        }

        self.audit(actor, "unblock_user", json!({ "userId": user_id }))
            .await;
        Ok(())
    }

    /// Reports a user's block state, unblocking first if the block has
    /// lapsed.
    pub async fn check_user_block_status(&self, user_id: Uuid) -> AppResult<BlockStatus> {
        let user = self.load_target(user_id).await?;

        if user.block_has_lapsed(self.clock.now()) {
            info!(user_id = %user_id, "Block lapsed, unblocking");
            self.unblock_user(user_id, &Actor::System(SystemAuthority::new()))
                .await?;
            return Ok(BlockStatus {
                status: UserStatus::Active,
                blocked_until: None,
                sanction: None,
            });
        }

        let sanction = if user.is_blocked() {
            self.sanctions.find_active(user_id).await?
        } else {
            None
        };
        Ok(BlockStatus {
            status: user.status,
            blocked_until: user.blocked_until,
            sanction,
        })
    }

    /// Unblocks every user whose block has lapsed. Returns how many were
    /// unblocked.
    pub async fn auto_unblock_expired_sanctions(&self) -> AppResult<usize> {
        let expired = self.sanctions.find_expired_blocks(self.clock.now()).await?;
        let system = Actor::System(SystemAuthority::new());

        let mut unblocked = 0;
        for user_id in expired {
            match self.unblock_user(user_id, &system).await {
                Ok(()) => unblocked += 1,
                Err(e) => warn!(user_id = %user_id, error = %e, "Failed to auto-unblock user"),
            }
        }
        if unblocked > 0 {
            info!(count = unblocked, "Auto-unblocked users with lapsed blocks");
        }
        Ok(unblocked)
    }

    /// Every sanction placed on a user, newest first.
    pub async fn list_sanctions(&self, user_id: Uuid) -> AppResult<Vec<Sanction>> {
        self.sanctions.list_for_user(user_id).await
    }

    async fn load_target(&self, user_id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    async fn audit(&self, actor: &Actor, action: &str, metadata: serde_json::Value) {
        let entry = AuditEntry {
            actor_id: actor.id(),
            actor_email: actor.email().map(str::to_string),
            category: AUDIT_CATEGORY.to_string(),
            action: action.to_string(),
            metadata,
        };
        if let Err(e) = self.audit.record(entry).await {
            warn!(action, error = %e, "Failed to record audit entry");
        }
    }
}

/// When a block of `hours` placed at `now` lapses. Zero means the
/// permanent horizon; anything past that horizon is a `BadRequest`.
fn block_deadline(now: DateTime<Utc>, hours: u64) -> AppResult<DateTime<Utc>> {
    let max_hours = PERMANENT_BLOCK_DAYS * 24;
    let span = if hours == 0 {
        chrono::Duration::try_days(PERMANENT_BLOCK_DAYS)
    } else {
        i64::try_from(hours)
            .ok()
            .filter(|h| *h <= max_hours)
            .and_then(chrono::Duration::try_hours)
    };
    span.and_then(|span| now.checked_add_signed(span)).ok_or_else(|| {
        AppError::bad_request(format!(
            "Block duration must be at most {max_hours} hours; use 0 for a permanent block"
        ))
    })
}

/// Privilege rules for sanctioning `target`.
fn authorize(actor: &Actor, target: &User) -> AppResult<()> {
    let admin = match actor {
        Actor::System(_) => return Ok(()),
        Actor::Admin(admin) => admin,
    };

    if admin.id == target.id {
        return Err(AppError::forbidden("You cannot sanction yourself"));
    }
    if !admin.role.is_admin() {
        return Err(AppError::forbidden("Only administrators can sanction users"));
    }
    if !admin.role.can_sanction(target.role) {
        return Err(AppError::forbidden(
            "Only a superadmin can sanction an administrator",
        ));
    }
    Ok(())
}
