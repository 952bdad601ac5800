//! Embedded schema migrations.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use keyward_core::error::{AppError, ErrorKind};
use keyward_core::result::AppResult;

/// Every migration under `migrations/`, compiled into the binary.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Apply pending migrations.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let before = pending_migrations(pool).await?.len();
    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, format!("Failed to run migrations: {e}"), e)
    })?;
    info!(applied = before, "Schema up to date");
    Ok(())
}

/// Migrations not yet applied, as `version description`.
pub async fn pending_migrations(pool: &PgPool) -> AppResult<Vec<String>> {
    let tracked: Option<String> =
        sqlx::query_scalar("SELECT to_regclass('_sqlx_migrations')::text")
            .fetch_one(pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Migration lookup failed", e))?;

    let applied: Vec<i64> = match tracked {
        Some(_) => sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success")
            .fetch_all(pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Migration lookup failed", e)
            })?,
        None => Vec::new(),
    };

    Ok(MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration() && !applied.contains(&m.version))
        .map(|m| format!("{} {}", m.version, m.description))
        .collect())
}
