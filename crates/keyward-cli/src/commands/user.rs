//! User, block and sanction CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use keyward_auth::{Actor, AdminIdentity, Argon2Verifier, BlockRequest};
use keyward_core::config::AppConfig;
use keyward_core::error::AppError;
use keyward_database::repositories::{PgUserRepository, UserRepository};
use keyward_entity::user::{CreateUser, User, UserRole};

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List users
    List {
        /// Maximum rows
        #[arg(short, long, default_value_t = 100)]
        limit: i64,
    },
    /// Register a user (prompts for the password)
    Create {
        /// Email address
        email: String,
        /// Role: user, admin or superadmin
        #[arg(short, long, default_value = "user")]
        role: String,
        /// Require an emailed code at login
        #[arg(long)]
        two_factor: bool,
    },
    /// Block a user
    Block {
        /// User ID or email
        user: String,
        /// Acting admin's email
        #[arg(long = "as")]
        admin: String,
        /// Duration in hours; 0 blocks permanently
        #[arg(long, default_value_t = 0)]
        hours: u64,
        /// Reason recorded on the sanction
        #[arg(long)]
        reason: String,
    },
    /// Lift a user's block
    Unblock {
        /// User ID or email
        user: String,
        /// Acting admin's email
        #[arg(long = "as")]
        admin: String,
    },
    /// Show a user's block status
    Status {
        /// User ID or email
        user: String,
    },
    /// List every sanction placed on a user
    Sanctions {
        /// User ID or email
        user: String,
    },
}

/// User display row for table output
#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    /// User ID
    id: String,
    /// Email
    email: String,
    /// Role
    role: String,
    /// Status
    status: String,
    /// 2FA
    two_factor: bool,
    /// Created at
    created_at: String,
}

/// Sanction display row
#[derive(Debug, Serialize, Tabled)]
struct SanctionRow {
    /// Sanction ID
    id: String,
    /// Placed by
    admin: String,
    /// Reason
    reason: String,
    /// Active
    active: bool,
    /// Expires
    expires_at: String,
}

/// Execute user commands
pub async fn execute(
    args: &UserArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let (db, engine) = super::build_engine(config).await?;
    let users = PgUserRepository::new(db.pool().clone());

    match &args.command {
        UserCommand::List { limit } => {
            let rows: Vec<UserRow> = users
                .list(*limit)
                .await?
                .iter()
                .map(|u| UserRow {
                    id: u.id.to_string(),
                    email: u.email.clone(),
                    role: u.role.to_string(),
                    status: u.status.as_str().to_string(),
                    two_factor: u.two_factor_enabled,
                    created_at: u.created_at.format("%Y-%m-%d %H:%M").to_string(),
                })
                .collect();
            output::print_list(&rows, format);
        }
        UserCommand::Create {
            email,
            role,
            two_factor,
        } => {
            let role: UserRole = role.parse()?;
            let password = dialoguer::Password::new()
                .with_prompt("Password")
                .with_confirmation("Confirm password", "Passwords do not match")
                .interact()
                .map_err(|e| AppError::internal(format!("Input error: {e}")))?;
            let password_hash = Argon2Verifier::new().hash(&password)?;

            let user = users
                .create(
                    CreateUser {
                        email: email.clone(),
                        password_hash,
                        role,
                        two_factor_enabled: *two_factor,
                    },
                    chrono::Utc::now(),
                )
                .await?;
            output::print_success(&format!("User {} created ({})", user.email, user.id));
        }
        UserCommand::Block {
            user,
            admin,
            hours,
            reason,
        } => {
            let target = find_user(&users, user).await?;
            let actor = admin_actor(&users, admin).await?;
            let sanction = engine
                .sanctions
                .block_user(
                    target.id,
                    &actor,
                    BlockRequest {
                        duration_hours: *hours,
                        reason: reason.clone(),
                    },
                )
                .await?;
            output::print_success(&format!(
                "User {} blocked until {}",
                target.email,
                sanction.expires_at.format("%Y-%m-%d %H:%M UTC")
            ));
        }
        UserCommand::Unblock { user, admin } => {
            let target = find_user(&users, user).await?;
            let actor = admin_actor(&users, admin).await?;
            engine.sanctions.unblock_user(target.id, &actor).await?;
            output::print_success(&format!("User {} unblocked", target.email));
        }
        UserCommand::Status { user } => {
            let target = find_user(&users, user).await?;
            let status = engine.sanctions.check_user_block_status(target.id).await?;
            output::print_item(&status, format);
        }
        UserCommand::Sanctions { user } => {
            let target = find_user(&users, user).await?;
            let rows: Vec<SanctionRow> = engine
                .sanctions
                .list_sanctions(target.id)
                .await?
                .iter()
                .map(|s| SanctionRow {
                    id: output::short_id(&s.id),
                    admin: s
                        .admin_id
                        .map(|id| output::short_id(&id))
                        .unwrap_or_else(|| "system".into()),
                    reason: s.reason.clone(),
                    active: s.active,
                    expires_at: s.expires_at.format("%Y-%m-%d %H:%M").to_string(),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    db.close().await;
    Ok(())
}

/// Resolve a user by UUID or email.
async fn find_user(users: &PgUserRepository, ident: &str) -> Result<User, AppError> {
    let found = match Uuid::parse_str(ident) {
        Ok(id) => users.find_by_id(id).await?,
        Err(_) => users.find_by_email(ident).await?,
    };
    found.ok_or_else(|| AppError::not_found(format!("User '{ident}' not found")))
}

async fn admin_actor(users: &PgUserRepository, email: &str) -> Result<Actor, AppError> {
    let admin = find_user(users, email).await?;
    Ok(Actor::Admin(AdminIdentity {
        id: admin.id,
        email: admin.email,
        role: admin.role,
    }))
}
