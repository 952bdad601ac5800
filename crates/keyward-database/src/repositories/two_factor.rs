//! One-time code state repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use keyward_core::result::AppResult;
use keyward_entity::two_factor::TwoFactorSecurity;

use super::db_err;

/// Per-user one-time code state.
#[async_trait]
pub trait TwoFactorRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Fetch the record for a user.
    async fn find(&self, user_id: Uuid) -> AppResult<Option<TwoFactorSecurity>>;

    /// Store a freshly issued code hash and reset the attempt counter.
    /// Creates the record on first issuance.
    async fn store_code(
        &self,
        user_id: Uuid,
        code_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<TwoFactorSecurity>;

    /// Count one wrong guess against the outstanding code. Returns the new
    /// counter, or `None` when no code is outstanding.
    async fn increment_attempts(&self, user_id: Uuid, now: DateTime<Utc>)
    -> AppResult<Option<i32>>;

    /// Atomically consume the outstanding code if it matches `code_hash`,
    /// is unexpired at `now`, and the counter is below `max_attempts`.
    /// Returns `false` if another caller consumed it first.
    async fn consume_code(
        &self,
        user_id: Uuid,
        code_hash: &str,
        now: DateTime<Utc>,
        max_attempts: i32,
    ) -> AppResult<bool>;

    /// Drop the outstanding code and reset the counter.
    async fn clear_code(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()>;
}

/// PostgreSQL-backed [`TwoFactorRepository`].
#[derive(Debug, Clone)]
pub struct PgTwoFactorRepository {
    pool: PgPool,
}

impl PgTwoFactorRepository {
    /// Create a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TwoFactorRepository for PgTwoFactorRepository {
    async fn find(&self, user_id: Uuid) -> AppResult<Option<TwoFactorSecurity>> {
        sqlx::query_as::<_, TwoFactorSecurity>(
            "SELECT * FROM two_factor_security WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to load two-factor state"))
    }

    async fn store_code(
        &self,
        user_id: Uuid,
        code_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<TwoFactorSecurity> {
        sqlx::query_as::<_, TwoFactorSecurity>(
            "INSERT INTO two_factor_security (user_id, code_hash, code_expires_at, attempts, updated_at) \
             VALUES ($1, $2, $3, 0, $4) \
             ON CONFLICT (user_id) DO UPDATE SET \
                code_hash = EXCLUDED.code_hash, \
                code_expires_at = EXCLUDED.code_expires_at, \
                attempts = 0, \
                updated_at = EXCLUDED.updated_at \
             RETURNING *",
        )
        .bind(user_id)
        .bind(code_hash)
        .bind(expires_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to store two-factor code"))
    }

    async fn increment_attempts(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<i32>> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE two_factor_security SET attempts = attempts + 1, updated_at = $2 \
             WHERE user_id = $1 AND code_hash IS NOT NULL RETURNING attempts",
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to record two-factor attempt"))
    }

    async fn consume_code(
        &self,
        user_id: Uuid,
        code_hash: &str,
        now: DateTime<Utc>,
        max_attempts: i32,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE two_factor_security \
             SET code_hash = NULL, code_expires_at = NULL, attempts = 0, updated_at = $3 \
             WHERE user_id = $1 AND code_hash = $2 AND code_expires_at > $3 AND attempts < $4",
        )
        .bind(user_id)
        .bind(code_hash)
        .bind(now)
        .bind(max_attempts)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to consume two-factor code"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn clear_code(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE two_factor_security \
             SET code_hash = NULL, code_expires_at = NULL, attempts = 0, updated_at = $2 \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to clear two-factor code"))?;
        Ok(())
    }
}
