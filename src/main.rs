//! Keyward server: session and credential-security engine.
//!
//! Wires the stores, the auth engine and the maintenance scheduler
//! together and runs until a shutdown signal arrives.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use keyward_auth::{AuthEngine, EngineDeps};
use keyward_cache::CacheManager;
use keyward_core::config::{AppConfig, LogFormat};
use keyward_core::error::AppError;
use keyward_core::traits::SystemClock;
use keyward_database::DatabasePool;
use keyward_worker::{CronScheduler, default_jobs};

#[tokio::main]
async fn main() {
    let env = std::env::var("KEYWARD_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = fmt().with_env_filter(filter).with_target(true);

    match config.logging.format {
        LogFormat::Json => builder.json().with_thread_ids(true).init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Keyward v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Durable store + migrations ───────────────────────
    let db = DatabasePool::connect(&config.database).await?;
    keyward_database::migration::run_migrations(db.pool()).await?;

    // ── Step 2: Ephemeral store ──────────────────────────────────
    tracing::info!(provider = %config.cache.provider, "Initializing cache");
    let cache = CacheManager::new(&config.cache).await?;
    if !cache.provider().health_check().await? {
        return Err(AppError::cache("Cache health check failed"));
    }

    // ── Step 3: Auth engine ──────────────────────────────────────
    let deps = EngineDeps::from_repositories(db.repositories(), cache.provider(), Arc::new(SystemClock));
    let engine = AuthEngine::new(&config, deps);

    // ── Step 4: Scheduled maintenance ────────────────────────────
    let mut scheduler = if config.worker.enabled {
        let mut scheduler = CronScheduler::new().await?;
        scheduler.register_all(default_jobs(&engine, &config)).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Scheduled maintenance disabled");
        None
    };

    tracing::info!(
        max_sessions_per_user = config.session.max_sessions_per_user,
        "Keyward ready"
    );

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping");

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler did not shut down cleanly");
        }
    }
    db.close().await;

    tracing::info!("Keyward stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
