//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Scheduled maintenance job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether scheduled jobs run in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron expression for purging old revoked sessions.
    #[serde(default = "default_session_cleanup_cron")]
    pub session_cleanup_cron: String,
    /// Cron expression for lifting expired sanctions.
    #[serde(default = "default_sanction_sweep_cron")]
    pub sanction_sweep_cron: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_cleanup_cron: default_session_cleanup_cron(),
            sanction_sweep_cron: default_sanction_sweep_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_session_cleanup_cron() -> String {
    "0 30 3 * * *".to_string()
}

fn default_sanction_sweep_cron() -> String {
    "0 */5 * * * *".to_string()
}
