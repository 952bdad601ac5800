//! Sanction repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_entity::sanction::{NewSanction, Sanction};

use super::db_err;

/// Sanctions and the user status they drive.
#[async_trait]
pub trait SanctionRepository: Send + Sync + std::fmt::Debug + 'static {
    /// In one transaction: deactivate the user's prior sanctions, insert
    /// `sanction`, and mark the user blocked until `sanction.expires_at`.
    /// Fails with `NotFound` if the user does not exist.
    async fn block_user(&self, sanction: NewSanction, now: DateTime<Utc>) -> AppResult<Sanction>;

    /// In one transaction: deactivate the user's sanctions, mark the user
    /// active and clear `blocked_until`. Returns `false` if the user does
    /// not exist.
    async fn unblock_user(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<bool>;

    /// The user's active sanction, if any.
    async fn find_active(&self, user_id: Uuid) -> AppResult<Option<Sanction>>;

    /// Every sanction placed on a user, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Sanction>>;

    /// IDs of blocked users whose block lapsed at or before `now`.
    async fn find_expired_blocks(&self, now: DateTime<Utc>) -> AppResult<Vec<Uuid>>;
}

/// PostgreSQL-backed [`SanctionRepository`].
#[derive(Debug, Clone)]
pub struct PgSanctionRepository {
    pool: PgPool,
}

impl PgSanctionRepository {
    /// Create a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SanctionRepository for PgSanctionRepository {
    async fn block_user(&self, sanction: NewSanction, now: DateTime<Utc>) -> AppResult<Sanction> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        let updated = sqlx::query(
            "UPDATE users SET status = 'blocked', blocked_until = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(sanction.user_id)
        .bind(sanction.expires_at)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to block user"))?;

        if updated.rows_affected() == 0 {
            return Err(AppError::not_found("User not found"));
        }

        sqlx::query("UPDATE sanctions SET active = FALSE WHERE user_id = $1 AND active = TRUE")
            .bind(sanction.user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to deactivate prior sanctions"))?;

        let created = sqlx::query_as::<_, Sanction>(
            "INSERT INTO sanctions (id, user_id, admin_id, reason, active, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, TRUE, $5, $6) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(sanction.user_id)
        .bind(sanction.admin_id)
        .bind(&sanction.reason)
        .bind(now)
        .bind(sanction.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err("Failed to record sanction"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit block"))?;
        Ok(created)
    }

    async fn unblock_user(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        sqlx::query("UPDATE sanctions SET active = FALSE WHERE user_id = $1 AND active = TRUE")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to deactivate sanctions"))?;

        let updated = sqlx::query(
            "UPDATE users SET status = 'active', blocked_until = NULL, updated_at = $2 WHERE id = $1",
        )
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to unblock user"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit unblock"))?;
        Ok(updated.rows_affected() == 1)
    }

    async fn find_active(&self, user_id: Uuid) -> AppResult<Option<Sanction>> {
        sqlx::query_as::<_, Sanction>(
            "SELECT * FROM sanctions WHERE user_id = $1 AND active = TRUE",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find active sanction"))
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Sanction>> {
        sqlx::query_as::<_, Sanction>(
            "SELECT * FROM sanctions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list sanctions"))
    }

    async fn find_expired_blocks(&self, now: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users \
             WHERE status = 'blocked' AND blocked_until IS NOT NULL AND blocked_until <= $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to find expired blocks"))
    }
}
