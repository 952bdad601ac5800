//! Session repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use keyward_core::result::AppResult;
use keyward_entity::session::{DeviceInfo, RevokedReason, Session};

use super::db_err;

/// Durable session records, one per logged-in device.
#[async_trait]
pub trait SessionRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Insert or refresh the session for `(user_id, device.session_key())`.
    ///
    /// A matching row gets the new refresh token, is un-revoked and has
    /// `last_used_at` bumped; `created_at` is only set on insert.
    async fn upsert(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        device: &DeviceInfo,
        now: DateTime<Utc>,
    ) -> AppResult<Session>;

    /// Find a session by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>>;

    /// Find the session currently bound to a refresh token.
    async fn find_by_refresh_token(&self, refresh_token: &str) -> AppResult<Option<Session>>;

    /// Non-revoked sessions for a user, most recently used first.
    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>>;

    /// Every session for a user, revoked or not.
    async fn find_all_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>>;

    /// Count non-revoked sessions for a user.
    async fn count_active_by_user(&self, user_id: Uuid) -> AppResult<i64>;

    /// Revoke every non-revoked session beyond the `keep` most recently
    /// used. Returns the sessions that were revoked.
    async fn revoke_excess(
        &self,
        user_id: Uuid,
        keep: u32,
        reason: RevokedReason,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Session>>;

    /// Revoke every non-revoked session of a user except `except`.
    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        except: Option<Uuid>,
        reason: RevokedReason,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Session>>;

    /// Revoke one session. Returns `None` if it does not exist. Revoking an
    /// already revoked session keeps its original reason.
    async fn revoke(
        &self,
        session_id: Uuid,
        reason: RevokedReason,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Session>>;

    /// Swap the refresh token of a live session, but only if it still holds
    /// `old_token`. Returns `false` when another rotation won.
    async fn rotate_refresh_token(
        &self,
        session_id: Uuid,
        old_token: &str,
        new_token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Hard-delete every session of a user, returning what was deleted.
    async fn delete_all_for_user(&self, user_id: Uuid) -> AppResult<Vec<Session>>;

    /// Hard-delete revoked sessions revoked before `cutoff`.
    async fn delete_revoked_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Session>>;
}

/// PostgreSQL-backed [`SessionRepository`].
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn upsert(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        device: &DeviceInfo,
        now: DateTime<Utc>,
    ) -> AppResult<Session> {
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions \
                (id, user_id, refresh_token, device_key, device_id, device_type, device_model, \
                 os, os_version, ip_address, revoked, created_at, last_used_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, $11, $11) \
             ON CONFLICT (user_id, device_key) DO UPDATE SET \
                refresh_token = EXCLUDED.refresh_token, \
                device_id = EXCLUDED.device_id, \
                device_type = EXCLUDED.device_type, \
                device_model = EXCLUDED.device_model, \
                os = EXCLUDED.os, \
                os_version = EXCLUDED.os_version, \
                ip_address = EXCLUDED.ip_address, \
                revoked = FALSE, \
                revoked_reason = NULL, \
                revoked_at = NULL, \
                last_used_at = EXCLUDED.last_used_at \
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(refresh_token)
        .bind(device.session_key())
        .bind(&device.device_id)
        .bind(&device.device_type)
        .bind(&device.device_model)
        .bind(&device.os)
        .bind(&device.os_version)
        .bind(&device.ip)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to upsert session"))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find session"))
    }

    async fn find_by_refresh_token(&self, refresh_token: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE refresh_token = $1")
            .bind(refresh_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find session by refresh token"))
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE user_id = $1 AND revoked = FALSE \
             ORDER BY last_used_at DESC, created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to find active sessions"))
    }

    async fn find_all_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE user_id = $1 ORDER BY last_used_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to find user sessions"))
    }

    async fn count_active_by_user(&self, user_id: Uuid) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sessions WHERE user_id = $1 AND revoked = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to count active sessions"))
    }

    async fn revoke_excess(
        &self,
        user_id: Uuid,
        keep: u32,
        reason: RevokedReason,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "WITH excess AS ( \
                SELECT id FROM sessions \
                WHERE user_id = $1 AND revoked = FALSE \
                ORDER BY last_used_at DESC, created_at DESC \
                OFFSET $2 \
                FOR UPDATE \
             ) \
             UPDATE sessions s \
             SET revoked = TRUE, revoked_reason = $3, revoked_at = $4 \
             FROM excess WHERE s.id = excess.id \
             RETURNING s.*",
        )
        .bind(user_id)
        .bind(i64::from(keep))
        .bind(reason)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to prune sessions"))
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        except: Option<Uuid>,
        reason: RevokedReason,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Session>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        let revoked = sqlx::query_as::<_, Session>(
            "UPDATE sessions \
             SET revoked = TRUE, revoked_reason = $3, revoked_at = $4 \
             WHERE user_id = $1 AND revoked = FALSE AND ($2::uuid IS NULL OR id <> $2) \
             RETURNING *",
        )
        .bind(user_id)
        .bind(except)
        .bind(reason)
        .bind(now)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err("Failed to revoke user sessions"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit session revocation"))?;
        Ok(revoked)
    }

    async fn revoke(
        &self,
        session_id: Uuid,
        reason: RevokedReason,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Session>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        let existing =
            sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1 FOR UPDATE")
                .bind(session_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err("Failed to lock session"))?;

        let session = match existing {
            None => return Ok(None),
            Some(session) if session.revoked => session,
            Some(_) => sqlx::query_as::<_, Session>(
                "UPDATE sessions SET revoked = TRUE, revoked_reason = $2, revoked_at = $3 \
                 WHERE id = $1 RETURNING *",
            )
            .bind(session_id)
            .bind(reason)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err("Failed to revoke session"))?,
        };

        tx.commit()
            .await
            .map_err(db_err("Failed to commit session revocation"))?;
        Ok(Some(session))
    }

    async fn rotate_refresh_token(
        &self,
        session_id: Uuid,
        old_token: &str,
        new_token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET refresh_token = $3, last_used_at = $4 \
             WHERE id = $1 AND refresh_token = $2 AND revoked = FALSE",
        )
        .bind(session_id)
        .bind(old_token)
        .bind(new_token)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to rotate refresh token"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>("DELETE FROM sessions WHERE user_id = $1 RETURNING *")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to delete user sessions"))
    }

    async fn delete_revoked_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Session>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        let deleted = sqlx::query_as::<_, Session>(
            "DELETE FROM sessions \
             WHERE revoked = TRUE AND COALESCE(revoked_at, last_used_at) < $1 \
             RETURNING *",
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err("Failed to delete revoked sessions"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit session cleanup"))?;
        Ok(deleted)
    }
}
