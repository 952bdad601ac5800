//! Token signing configuration.

use serde::{Deserialize, Serialize};

/// Access/refresh token configuration.
///
/// The two secrets must be distinct so that an access token can never be
/// replayed as a refresh token (and vice versa).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC-SHA256 secret for access tokens.
    #[serde(default)]
    pub access_token_secret: String,
    /// HMAC-SHA256 secret for refresh tokens.
    #[serde(default)]
    pub refresh_token_secret: String,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_minutes: u64,
    /// Refresh token TTL in days.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_days: u64,
}

impl AuthConfig {
    /// Access token lifetime.
    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_ttl_minutes as i64)
    }

    /// Refresh token lifetime.
    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_token_ttl_days as i64)
    }

    /// Refresh token lifetime in whole seconds.
    pub fn refresh_ttl_seconds(&self) -> u64 {
        self.refresh_token_ttl_days * 24 * 60 * 60
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: String::new(),
            refresh_token_secret: String::new(),
            access_token_ttl_minutes: default_access_ttl(),
            refresh_token_ttl_days: default_refresh_ttl(),
        }
    }
}

fn default_access_ttl() -> u64 {
    60
}

fn default_refresh_ttl() -> u64 {
    30
}
