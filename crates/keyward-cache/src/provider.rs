//! Selects the ephemeral store backend from configuration.

use std::sync::Arc;

use tracing::info;

use keyward_core::config::cache::CacheConfig;
use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::traits::cache::CacheProvider;

/// Holds the ephemeral store chosen by `cache.provider`.
#[derive(Debug, Clone)]
pub struct CacheManager {
    backend: Arc<dyn CacheProvider>,
    kind: &'static str,
}

impl CacheManager {
    /// Connects the configured backend (`memory` or `redis`).
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        let (backend, kind): (Arc<dyn CacheProvider>, &'static str) =
            match config.provider.as_str() {
                #[cfg(feature = "redis-backend")]
                "redis" => {
                    let client = crate::redis::RedisClient::connect(&config.redis).await?;
                    (Arc::new(crate::redis::RedisCacheProvider::new(client)), "redis")
                }
                #[cfg(feature = "memory")]
                "memory" => (
                    Arc::new(crate::memory::MemoryCacheProvider::new(&config.memory)),
                    "memory",
                ),
                other => {
                    return Err(AppError::configuration(format!(
                        "Unknown cache provider: '{other}'. Supported: memory, redis"
                    )));
                }
            };

        info!(provider = kind, "Ephemeral store ready");
        Ok(Self { backend, kind })
    }

    /// Shared handle to the backend.
    pub fn provider(&self) -> Arc<dyn CacheProvider> {
        Arc::clone(&self.backend)
    }

    /// Which backend was selected.
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use std::time::Duration;

    use keyward_core::error::ErrorKind;

    #[tokio::test]
    async fn test_unknown_provider_is_rejected() {
        let config = CacheConfig {
            provider: "memcached".into(),
            ..CacheConfig::default()
        };
        let err = CacheManager::new(&config).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_memory_provider_selected() {
        let config = CacheConfig {
            provider: "memory".into(),
            ..CacheConfig::default()
        };
        let manager = CacheManager::new(&config).await.unwrap();
        assert_eq!(manager.kind(), "memory");

        let cache = manager.provider();
        cache.set("k", "v", Duration::from_secs(10)).await.unwrap();
        assert!(cache.exists("k").await.unwrap());
    }
}
