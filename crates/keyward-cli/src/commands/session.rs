//! Session management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use keyward_core::config::AppConfig;
use keyward_core::error::AppError;
use keyward_entity::session::{RevokedReason, Session};

/// Arguments for session commands
#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Session subcommand
    #[command(subcommand)]
    pub command: SessionCommand,
}

/// Session subcommands
#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// List a user's sessions
    List {
        /// User ID
        user_id: String,
        /// Include revoked sessions
        #[arg(long)]
        all: bool,
    },
    /// Count a user's live sessions
    Count {
        /// User ID
        user_id: String,
    },
    /// Revoke one session
    Revoke {
        /// Session ID
        id: String,
        /// Revocation reason, e.g. force_logout
        #[arg(short, long, default_value = "force_logout")]
        reason: String,
    },
    /// Revoke every session of a user except one
    RevokeOthers {
        /// User ID
        user_id: String,
        /// Session to keep
        #[arg(long)]
        keep: Option<String>,
    },
    /// Hard-delete every session of a user
    Purge {
        /// User ID
        user_id: String,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
    /// Delete sessions revoked longer ago than the retention window
    Cleanup {
        /// Retention in days (defaults to the configured value)
        #[arg(long)]
        retention_days: Option<u32>,
    },
}

/// Session display row
#[derive(Debug, Serialize, Tabled)]
struct SessionRow {
    /// Session ID
    id: String,
    /// Device
    device: String,
    /// IP address
    ip: String,
    /// Last used
    last_used: String,
    /// Revocation state
    state: String,
}

impl From<&Session> for SessionRow {
    fn from(s: &Session) -> Self {
        let device = [s.device_type.as_deref(), s.device_model.as_deref(), s.os.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" / ");
        Self {
            id: s.id.to_string(),
            device: if device.is_empty() { "-".into() } else { device },
            ip: s.ip_address.clone().unwrap_or_else(|| "-".into()),
            last_used: s.last_used_at.format("%Y-%m-%d %H:%M").to_string(),
            state: match s.revoked_reason {
                Some(reason) if s.revoked => format!("revoked ({reason})"),
                _ if s.revoked => "revoked".into(),
                _ => "active".into(),
            },
        }
    }
}

/// Execute session commands
pub async fn execute(
    args: &SessionArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let (db, engine) = super::build_engine(config).await?;
    let sessions = &engine.sessions;

    match &args.command {
        SessionCommand::List { user_id, all } => {
            let user_id = super::parse_id(user_id)?;
            let list = if *all {
                sessions.get_user_sessions(user_id).await?
            } else {
                sessions.get_user_active_sessions(user_id).await?
            };
            let rows: Vec<SessionRow> = list.iter().map(SessionRow::from).collect();
            output::print_list(&rows, format);
        }
        SessionCommand::Count { user_id } => {
            let count = sessions
                .get_active_sessions_count(super::parse_id(user_id)?)
                .await?;
            output::print_kv("Active sessions", &count.to_string());
            output::print_kv("Limit", &sessions.max_sessions().to_string());
        }
        SessionCommand::Revoke { id, reason } => {
            let reason: RevokedReason = reason.parse()?;
            let session = sessions
                .invalidate_specific_session(super::parse_id(id)?, reason)
                .await?;
            output::print_success(&format!(
                "Session {} of user {} revoked",
                session.id, session.user_id
            ));
        }
        SessionCommand::RevokeOthers { user_id, keep } => {
            let keep = keep.as_deref().map(super::parse_id).transpose()?;
            let outcome = sessions
                .invalidate_all_except_current(super::parse_id(user_id)?, keep)
                .await?;
            output::print_item(&outcome, format);
        }
        SessionCommand::Purge { user_id, force } => {
            let user_id = super::parse_id(user_id)?;
            if !super::confirm(&format!("Delete ALL sessions of user {user_id}?"), *force)? {
                println!("Cancelled.");
                return Ok(());
            }
            let count = sessions.delete_all_user_sessions(user_id).await?;
            output::print_success(&format!("Deleted {count} sessions"));
        }
        SessionCommand::Cleanup { retention_days } => {
            let days = retention_days.unwrap_or(config.session.cleanup_retention_days);
            let count = sessions.cleanup_revoked_sessions(days).await?;
            output::print_success(&format!(
                "Removed {count} sessions revoked more than {days} days ago"
            ));
        }
    }

    db.close().await;
    Ok(())
}
