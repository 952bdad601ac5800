//! Scheduled job commands.

use clap::{Args, Subcommand};

use crate::output;
use keyward_core::config::AppConfig;
use keyward_core::error::AppError;
use keyward_worker::default_jobs;

/// Arguments for worker commands
#[derive(Debug, Args)]
pub struct WorkerArgs {
    /// Worker subcommand
    #[command(subcommand)]
    pub command: WorkerCommand,
}

/// Worker subcommands
#[derive(Debug, Subcommand)]
pub enum WorkerCommand {
    /// List scheduled jobs and their schedules
    List,
    /// Run one job immediately
    RunOnce {
        /// Job name, e.g. revoked_session_cleanup
        job: String,
    },
}

/// Execute worker commands
pub async fn execute(args: &WorkerArgs, config: &AppConfig) -> Result<(), AppError> {
    let (db, engine) = super::build_engine(config).await?;
    let jobs = default_jobs(&engine, config);

    match &args.command {
        WorkerCommand::List => {
            output::print_kv("Scheduler enabled", &config.worker.enabled.to_string());
            for job in &jobs {
                output::print_kv(job.name(), job.schedule());
            }
        }
        WorkerCommand::RunOnce { job } => {
            let task = jobs
                .iter()
                .find(|j| j.name() == job)
                .ok_or_else(|| AppError::not_found(format!("No job named '{job}'")))?;
            let report = task.run().await?;
            output::print_success(&format!("{job} finished"));
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    db.close().await;
    Ok(())
}
