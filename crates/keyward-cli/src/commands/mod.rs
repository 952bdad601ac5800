//! CLI command definitions and dispatch.

pub mod migrate;
pub mod session;
pub mod user;
pub mod worker;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::output::OutputFormat;
use keyward_auth::{AuthEngine, EngineDeps};
use keyward_cache::CacheManager;
use keyward_core::config::AppConfig;
use keyward_core::error::AppError;
use keyward_core::traits::SystemClock;
use keyward_database::DatabasePool;

/// Keyward: session and credential-security administration
#[derive(Debug, Parser)]
#[command(name = "keyward", version, about, long_about = None)]
pub struct Cli {
    /// Configuration overlay to load on top of config/default.toml
    #[arg(short, long, env = "KEYWARD_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Show engine logs on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Session inspection and revocation
    Session(session::SessionArgs),
    /// Users, blocks and sanctions
    User(user::UserArgs),
    /// Scheduled job management
    Worker(worker::WorkerArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = AppConfig::load(&self.env)?;
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::Session(args) => session::execute(args, &config, self.format).await,
            Commands::User(args) => user::execute(args, &config, self.format).await,
            Commands::Worker(args) => worker::execute(args, &config).await,
        }
    }
}

/// Helper: connect both stores and assemble the engine
pub async fn build_engine(config: &AppConfig) -> Result<(DatabasePool, AuthEngine), AppError> {
    let db = DatabasePool::connect(&config.database).await?;
    let cache = CacheManager::new(&config.cache).await?;
    let deps = EngineDeps::from_repositories(db.repositories(), cache.provider(), Arc::new(SystemClock));
    Ok((db, AuthEngine::new(config, deps)))
}

/// Helper: parse a UUID argument
pub fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|e| AppError::bad_request(format!("Invalid UUID '{raw}': {e}")))
}

/// Helper: ask before a destructive action unless `force` is set
pub fn confirm(prompt: &str, force: bool) -> Result<bool, AppError> {
    if force {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}
