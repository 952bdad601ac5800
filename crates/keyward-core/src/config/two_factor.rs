//! Two-factor code configuration.

use serde::{Deserialize, Serialize};

/// Emailed one-time code configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorConfig {
    /// Code validity window in minutes.
    #[serde(default = "default_code_ttl")]
    pub code_ttl_minutes: u64,
    /// Failed verifications tolerated before lockout.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
    /// Minimum delay between resend requests.
    #[serde(default = "default_resend_cooldown")]
    pub resend_cooldown_seconds: u64,
    /// Upper bound on codes issued to one user per hour.
    #[serde(default = "default_max_codes_per_hour")]
    pub max_codes_per_hour: i64,
    /// Server-side pepper mixed into the stored code hash.
    #[serde(default)]
    pub code_pepper: String,
}

impl Default for TwoFactorConfig {
    fn default() -> Self {
        Self {
            code_ttl_minutes: default_code_ttl(),
            max_attempts: default_max_attempts(),
            resend_cooldown_seconds: default_resend_cooldown(),
            max_codes_per_hour: default_max_codes_per_hour(),
            code_pepper: String::new(),
        }
    }
}

fn default_code_ttl() -> u64 {
    5
}

fn default_max_attempts() -> i32 {
    10
}

fn default_resend_cooldown() -> u64 {
    60
}

fn default_max_codes_per_hour() -> i64 {
    10
}
