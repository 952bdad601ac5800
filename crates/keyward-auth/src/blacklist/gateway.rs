//! Blacklist gateway: fast-path rejection of revoked refresh tokens.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use keyward_cache::keys;
use keyward_core::config::BlacklistConfig;
use keyward_core::result::AppResult;
use keyward_core::traits::CacheProvider;

use super::retry::RetryPolicy;

/// Value stored under every blacklist key.
const REVOKED_MARKER: &str = "revoked";

/// Keys per pipelined batch.
const BULK_CHUNK: usize = 500;

/// Reads and writes the two blacklist namespaces.
///
/// Single-key operations propagate errors once retries are exhausted.
/// Bulk operations log and carry on: by the time they run, the durable
/// store already holds the authoritative revocation.
#[derive(Debug, Clone)]
pub struct BlacklistGateway {
    cache: Arc<dyn CacheProvider>,
    single: RetryPolicy,
    bulk: RetryPolicy,
    permanent_ttl: Duration,
    temporary_ttl: Duration,
}

impl BlacklistGateway {
    /// Creates a gateway over the given ephemeral store.
    pub fn new(cache: Arc<dyn CacheProvider>, config: &BlacklistConfig) -> Self {
        Self {
            cache,
            single: RetryPolicy::single(&config.retry),
            bulk: RetryPolicy::bulk(&config.retry),
            permanent_ttl: Duration::from_secs(config.permanent_ttl_seconds()),
            temporary_ttl: Duration::from_secs(config.temporary_ttl_seconds),
        }
    }

    /// TTL used for entries that should outlive any refresh token.
    pub fn permanent_ttl(&self) -> Duration {
        self.permanent_ttl
    }

    /// Whether `token` is in either blacklist namespace.
    ///
    /// Errors after retries propagate; callers must treat them as "cannot
    /// confirm not revoked" and reject.
    pub async fn is_revoked(&self, token: &str) -> AppResult<bool> {
        let pair = keys::blacklist_pair(token);
        self.single
            .run("blacklist.is_revoked", || self.cache.exists_any(&pair))
            .await
    }

    /// Blacklist one token for `ttl`.
    pub async fn add(&self, token: &str, ttl: Duration) -> AppResult<()> {
        let key = keys::blacklist_refresh(token);
        self.single
            .run("blacklist.add", || self.cache.set(&key, REVOKED_MARKER, ttl))
            .await?;
        debug!(ttl_secs = ttl.as_secs(), "Refresh token blacklisted");
        Ok(())
    }

    /// Blacklist one token with the permanent TTL.
    pub async fn add_permanent(&self, token: &str) -> AppResult<()> {
        self.add(token, self.permanent_ttl).await
    }

    /// Short-lived entry that rejects a refresh token replayed while it is
    /// being rotated.
    pub async fn add_temporary(&self, token: &str) -> AppResult<()> {
        let key = keys::temp_blacklist_refresh(token);
        let ttl = self.temporary_ttl;
        self.single
            .run("blacklist.add_temporary", || {
                self.cache.set(&key, REVOKED_MARKER, ttl)
            })
            .await
    }

    /// Blacklist many tokens. Never fails; returns how many were written.
    pub async fn bulk_add(&self, entries: &[(String, Duration)]) -> usize {
        let mut written = 0usize;
        for chunk in entries.chunks(BULK_CHUNK) {
            let batch: Vec<(String, String, Duration)> = chunk
                .iter()
                .map(|(token, ttl)| {
                    (
                        keys::blacklist_refresh(token),
                        REVOKED_MARKER.to_string(),
                        *ttl,
                    )
                })
                .collect();

            match self
                .bulk
                .run("blacklist.bulk_add", || self.cache.set_many(&batch))
                .await
            {
                Ok(()) => written += batch.len(),
                Err(e) => error!(
                    count = batch.len(),
                    error = %e,
                    "Bulk blacklist add failed after retries; durable revocation stands"
                ),
            }
        }
        if !entries.is_empty() {
            info!(requested = entries.len(), written, "Bulk blacklist add finished");
        }
        written
    }

    /// Blacklist many tokens with one shared TTL.
    pub async fn bulk_add_with_ttl(&self, tokens: &[String], ttl: Duration) -> usize {
        let entries: Vec<(String, Duration)> = tokens.iter().map(|t| (t.clone(), ttl)).collect();
        self.bulk_add(&entries).await
    }

    /// Remove tokens from both namespaces. Never fails; returns how many
    /// keys were deleted.
    pub async fn bulk_remove(&self, tokens: &[String]) -> u64 {
        let mut removed = 0u64;
        for chunk in tokens.chunks(BULK_CHUNK / 2) {
            let batch: Vec<String> = chunk
                .iter()
                .flat_map(|token| keys::blacklist_pair(token))
                .collect();

            match self
                .bulk
                .run("blacklist.bulk_remove", || self.cache.delete_many(&batch))
                .await
            {
                Ok(n) => removed += n,
                Err(e) => error!(
                    count = chunk.len(),
                    error = %e,
                    "Bulk blacklist removal failed after retries"
                ),
            }
        }
        if !tokens.is_empty() {
            info!(requested = tokens.len(), removed, "Bulk blacklist removal finished");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_cache::memory::MemoryCacheProvider;
    use keyward_core::config::MemoryCacheConfig;

    fn gateway() -> (BlacklistGateway, Arc<MemoryCacheProvider>) {
        let cache = Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default()));
        let gateway = BlacklistGateway::new(cache.clone(), &BlacklistConfig::default());
        (gateway, cache)
    }

    #[tokio::test]
    async fn test_add_uses_shared_key_layout() {
        let (gateway, cache) = gateway();
        gateway.add("tok", Duration::from_secs(60)).await.unwrap();

        assert!(cache.exists("blacklist:refresh:tok").await.unwrap());
        assert!(gateway.is_revoked("tok").await.unwrap());
        assert!(!gateway.is_revoked("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_temporary_entry_counts_as_revoked() {
        let (gateway, cache) = gateway();
        gateway.add_temporary("tok").await.unwrap();

        assert!(cache.exists("temp_blacklist:refresh:tok").await.unwrap());
        assert!(gateway.is_revoked("tok").await.unwrap());
    }

    #[tokio::test]
    async fn test_bulk_add_then_remove_clears_both_namespaces() {
        let (gateway, _cache) = gateway();
        let tokens = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            gateway
                .bulk_add_with_ttl(&tokens, Duration::from_secs(60))
                .await,
            2
        );
        gateway.add_temporary("a").await.unwrap();

        let removed = gateway.bulk_remove(&tokens).await;
        assert_eq!(removed, 3);
        assert!(!gateway.is_revoked("a").await.unwrap());
        assert!(!gateway.is_revoked("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_bulk_is_noop() {
        let (gateway, _cache) = gateway();
        assert_eq!(gateway.bulk_add(&[]).await, 0);
        assert_eq!(gateway.bulk_remove(&[]).await, 0);
    }
}
