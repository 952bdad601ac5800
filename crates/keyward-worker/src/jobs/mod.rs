//! Built-in scheduled jobs.

pub mod sanction_sweep;
pub mod session_cleanup;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use keyward_auth::AuthEngine;
use keyward_core::config::AppConfig;
use keyward_core::result::AppResult;

pub use sanction_sweep::SanctionExpirySweepJob;
pub use session_cleanup::RevokedSessionCleanupJob;

/// A unit of periodic work.
#[async_trait]
pub trait ScheduledJob: Send + Sync + std::fmt::Debug {
    /// Stable job name, used in logs and by `worker run-once`.
    fn name(&self) -> &'static str;

    /// Cron expression (six fields, seconds first).
    fn schedule(&self) -> &str;

    /// Run once and report what was done.
    async fn run(&self) -> AppResult<Value>;
}

/// The jobs every deployment runs, bound to `engine`.
pub fn default_jobs(engine: &AuthEngine, config: &AppConfig) -> Vec<Arc<dyn ScheduledJob>> {
    vec![
        Arc::new(RevokedSessionCleanupJob::new(
            engine.sessions.clone(),
            config.session.cleanup_retention_days,
            config.worker.session_cleanup_cron.clone(),
        )),
        Arc::new(SanctionExpirySweepJob::new(
            engine.sanctions.clone(),
            config.worker.sanction_sweep_cron.clone(),
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use keyward_auth::{Actor, AdminIdentity, BlockRequest, EngineDeps};
    use keyward_cache::memory::MemoryCacheProvider;
    use keyward_core::config::MemoryCacheConfig;
    use keyward_core::traits::{Clock, ManualClock};
    use keyward_database::MemoryStore;
    use keyward_database::repositories::UserRepository;
    use keyward_entity::session::{DeviceInfo, RevokedReason};
    use keyward_entity::user::{CreateUser, UserRole};

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.access_token_secret = "access".into();
        config.auth.refresh_token_secret = "refresh".into();
        config
    }

    #[tokio::test]
    async fn test_default_jobs_run_against_engine() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default()));
        let config = config();
        let engine = AuthEngine::new(
            &config,
            EngineDeps::with_store(store.clone(), cache, clock.clone()),
        );

        let new_user = |email: &str, role| CreateUser {
            email: email.into(),
            password_hash: String::new(),
            role,
            two_factor_enabled: false,
        };
        let admin = UserRepository::create(store.as_ref(), new_user("a@example.com", UserRole::Admin), clock.now())
            .await
            .unwrap();
        let user = UserRepository::create(store.as_ref(), new_user("u@example.com", UserRole::User), clock.now())
            .await
            .unwrap();

        let session = engine
            .sessions
            .create_or_update_session(user.id, "tok", &DeviceInfo::default())
            .await
            .unwrap();
        engine
            .sessions
            .invalidate_specific_session(session.id, RevokedReason::ManuallyRevoked)
            .await
            .unwrap();
        engine
            .sanctions
            .block_user(
                user.id,
                &Actor::Admin(AdminIdentity {
                    id: admin.id,
                    email: admin.email.clone(),
                    role: admin.role,
                }),
                BlockRequest {
                    duration_hours: 1,
                    reason: "spam".into(),
                },
            )
            .await
            .unwrap();

        clock.advance(Duration::days(31));

        let jobs = default_jobs(&engine, &config);
        let names: Vec<_> = jobs.iter().map(|j| j.name()).collect();
        assert_eq!(names, ["revoked_session_cleanup", "sanction_expiry_sweep"]);

        let cleanup = jobs[0].run().await.unwrap();
        assert_eq!(cleanup["deleted_sessions"], 1);
        let sweep = jobs[1].run().await.unwrap();
        assert_eq!(sweep["unblocked_users"], 1);
    }
}
