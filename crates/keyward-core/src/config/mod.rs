//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod auth;
pub mod blacklist;
pub mod cache;
pub mod database;
pub mod logging;
pub mod session;
pub mod two_factor;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::auth::AuthConfig;
pub use self::blacklist::{BlacklistConfig, RetryConfig};
pub use self::cache::{CacheConfig, MemoryCacheConfig, RedisCacheConfig};
pub use self::database::DatabaseConfig;
pub use self::logging::{LogFormat, LoggingConfig};
pub use self::session::SessionConfig;
pub use self::two_factor::TwoFactorConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Environment variable that overrides `session.max_sessions_per_user`.
pub const MAX_SESSIONS_ENV: &str = "MAX_SESSIONS_PER_USER";

/// One-time codes live at most a day.
const MAX_CODE_TTL_MINUTES: u64 = 24 * 60;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache provider settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Token signing settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Session management settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Refresh-token blacklist settings.
    #[serde(default)]
    pub blacklist: BlacklistConfig,
    /// Two-factor code settings.
    #[serde(default)]
    pub two_factor: TwoFactorConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `KEYWARD__`. The bare
    /// `MAX_SESSIONS_PER_USER` variable is applied last.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("KEYWARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let mut app: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        if let Ok(raw) = std::env::var(MAX_SESSIONS_ENV) {
            app.apply_max_sessions_override(&raw)?;
        }

        app.validate()?;
        Ok(app)
    }

    /// Apply a raw `MAX_SESSIONS_PER_USER` value.
    pub fn apply_max_sessions_override(&mut self, raw: &str) -> Result<(), AppError> {
        let value: u32 = raw.trim().parse().map_err(|_| {
            AppError::configuration(format!("{MAX_SESSIONS_ENV} must be a positive integer"))
        })?;
        self.session.max_sessions_per_user = value;
        Ok(())
    }

    /// Reject configurations the engine cannot run with safely.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.auth.access_token_secret.is_empty() || self.auth.refresh_token_secret.is_empty() {
            return Err(AppError::configuration(
                "auth.access_token_secret and auth.refresh_token_secret must be set",
            ));
        }
        if self.auth.access_token_secret == self.auth.refresh_token_secret {
            return Err(AppError::configuration(
                "Access and refresh token secrets must differ",
            ));
        }
        if self.session.max_sessions_per_user == 0 {
            return Err(AppError::configuration(
                "session.max_sessions_per_user must be at least 1",
            ));
        }
        if self.two_factor.code_pepper.trim().is_empty() {
            return Err(AppError::configuration("two_factor.code_pepper must be set"));
        }
        if !(1..=MAX_CODE_TTL_MINUTES).contains(&self.two_factor.code_ttl_minutes) {
            return Err(AppError::configuration(format!(
                "two_factor.code_ttl_minutes must be between 1 and {MAX_CODE_TTL_MINUTES}"
            )));
        }
        if self.blacklist.retry.max_attempts == 0 || self.blacklist.retry.bulk_max_attempts == 0 {
            return Err(AppError::configuration(
                "blacklist retry attempts must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn valid() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.access_token_secret = "access-secret".into();
        config.auth.refresh_token_secret = "refresh-secret".into();
        config.two_factor.code_pepper = "pepper".into();
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.session.max_sessions_per_user, 5);
        assert_eq!(config.auth.access_token_ttl_minutes, 60);
        assert_eq!(config.auth.refresh_token_ttl_days, 30);
        assert_eq!(config.blacklist.temporary_ttl_seconds, 60);
        assert_eq!(config.blacklist.retry.max_attempts, 3);
        assert_eq!(config.blacklist.retry.bulk_max_attempts, 5);
        assert_eq!(config.two_factor.code_ttl_minutes, 5);
        assert_eq!(config.two_factor.max_attempts, 10);
        assert_eq!(config.cache.redis.key_prefix, "");
    }

    #[test]
    fn test_validate_accepts_distinct_secrets() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_shared_secret() {
        let mut config = valid();
        config.auth.refresh_token_secret = config.auth.access_token_secret.clone();
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_validate_rejects_missing_secret() {
        let mut config = valid();
        config.auth.access_token_secret.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_pepper() {
        for pepper in ["", "   "] {
            let mut config = valid();
            config.two_factor.code_pepper = pepper.into();
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind, ErrorKind::Configuration);
            assert!(err.message.contains("code_pepper"));
        }
    }

    #[test]
    fn test_validate_bounds_code_ttl() {
        let mut config = valid();
        config.two_factor.code_ttl_minutes = 0;
        assert!(config.validate().is_err());
        config.two_factor.code_ttl_minutes = u64::MAX;
        assert!(config.validate().is_err());
        config.two_factor.code_ttl_minutes = 24 * 60;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_sessions_override() {
        let mut config = valid();
        config.apply_max_sessions_override(" 3 ").unwrap();
        assert_eq!(config.session.max_sessions_per_user, 3);
        assert!(config.apply_max_sessions_override("many").is_err());
    }

    #[test]
    fn test_refresh_ttl_seconds() {
        let config = AppConfig::default();
        assert_eq!(config.auth.refresh_ttl_seconds(), 30 * 86_400);
        assert_eq!(config.blacklist.permanent_ttl_seconds(), 365 * 86_400);
    }
}
