//! The ephemeral store: short-lived string keys that may vanish at any
//! time without losing durable state.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Redis or moka behind one interface.
///
/// Values are strings and every write names its TTL. Errors are always
/// [`ErrorKind::Cache`](crate::error::ErrorKind::Cache) so callers can
/// tell an unreachable store from a missing key.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// `None` for missing and expired keys alike.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Writes only when `key` is absent; `false` means someone got there first.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool>;

    /// Atomically adds one. A new counter starts at 1 and never expires
    /// until [`expire`](CacheProvider::expire) is called on it.
    async fn incr(&self, key: &str) -> AppResult<i64>;

    /// Adds one and, in the same atomic step, gives the key `ttl` if it
    /// has no TTL yet. An existing TTL is left alone, so the window is
    /// fixed from the first increment and a counter can never be stranded
    /// without one.
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> AppResult<i64>;

    /// `false` when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool>;

    /// `(key, value, ttl)` triples in one round trip.
    async fn set_many(&self, entries: &[(String, String, Duration)]) -> AppResult<()>;

    /// Returns how many of `keys` were present.
    async fn delete_many(&self, keys: &[String]) -> AppResult<u64>;

    async fn exists_any(&self, keys: &[String]) -> AppResult<bool>;

    async fn health_check(&self) -> AppResult<bool>;
}
