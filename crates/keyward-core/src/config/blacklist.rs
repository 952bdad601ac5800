//! Refresh-token blacklist configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Blacklist entry lifetimes and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistConfig {
    /// TTL for entries written without an explicit lifetime (permanent bans).
    #[serde(default = "default_permanent_ttl_days")]
    pub permanent_ttl_days: u64,
    /// TTL for the short-lived entry written during refresh rotation.
    #[serde(default = "default_temporary_ttl")]
    pub temporary_ttl_seconds: u64,
    /// Retry policy for blacklist writes.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl BlacklistConfig {
    /// Permanent entry TTL in seconds.
    pub fn permanent_ttl_seconds(&self) -> u64 {
        self.permanent_ttl_days * 24 * 60 * 60
    }
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            permanent_ttl_days: default_permanent_ttl_days(),
            temporary_ttl_seconds: default_temporary_ttl(),
            retry: RetryConfig::default(),
        }
    }
}

/// Exponential-backoff retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts for single-key operations.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Attempts for bulk operations.
    #[serde(default = "default_bulk_max_attempts")]
    pub bulk_max_attempts: u32,
    /// Delay before the first retry.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    /// Upper bound on any single delay.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl RetryConfig {
    /// Initial backoff as a [`Duration`].
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Maximum backoff as a [`Duration`].
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            bulk_max_attempts: default_bulk_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_permanent_ttl_days() -> u64 {
    365
}

fn default_temporary_ttl() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_bulk_max_attempts() -> u32 {
    5
}

fn default_initial_backoff() -> u64 {
    100
}

fn default_max_backoff() -> u64 {
    2000
}
