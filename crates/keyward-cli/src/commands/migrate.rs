//! Schema migration commands.

use clap::{Args, Subcommand};

use crate::output;
use keyward_core::config::AppConfig;
use keyward_core::error::AppError;
use keyward_database::{DatabasePool, migration};

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
    /// Check connectivity and list pending migrations
    Check,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    let db = DatabasePool::connect(&config.database).await?;

    match &args.command {
        MigrateCommand::Run => {
            let pending = migration::pending_migrations(db.pool()).await?;
            migration::run_migrations(db.pool()).await?;
            output::print_success(&format!("Applied {} migrations", pending.len()));
        }
        MigrateCommand::Check => {
            output::print_kv("Database reachable", &db.health_check().await?.to_string());
            let pending = migration::pending_migrations(db.pool()).await?;
            output::print_kv("Pending migrations", &pending.len().to_string());
            for name in &pending {
                println!("  {name}");
            }
        }
    }

    db.close().await;
    Ok(())
}
