//! User repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use keyward_core::error::{AppError, ErrorKind};
use keyward_core::result::AppResult;
use keyward_entity::user::{CreateUser, User};

use super::db_err;

/// Read and register users.
#[async_trait]
pub trait UserRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Find a user by primary key.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find a user by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Register a new user. Fails with `Conflict` if the email is taken.
    async fn create(&self, input: CreateUser, now: DateTime<Utc>) -> AppResult<User>;

    /// List users, newest first.
    async fn list(&self, limit: i64) -> AppResult<Vec<User>>;
}

/// PostgreSQL-backed [`UserRepository`].
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find user by id"))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find user by email"))
    }

    async fn create(&self, input: CreateUser, now: DateTime<Utc>) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, password_hash, role, status, two_factor_enabled, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, 'active', $5, $6, $6) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(input.role)
        .bind(input.two_factor_enabled)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::with_source(ErrorKind::Conflict, "Email already registered", e)
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create user", e),
        })
    }

    async fn list(&self, limit: i64) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list users"))
    }
}
