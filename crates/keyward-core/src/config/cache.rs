//! `[cache]` section: which ephemeral store backs the blacklist and
//! two-factor counters.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `"memory"` (single node) or `"redis"` (shared).
    pub provider: String,
    pub redis: RedisCacheConfig,
    pub memory: MemoryCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            provider: "memory".into(),
            redis: RedisCacheConfig::default(),
            memory: MemoryCacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisCacheConfig {
    pub url: String,
    /// Prepended to every key. Empty keeps the `blacklist:refresh:<token>`
    /// layout that other services read.
    pub key_prefix: String,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".into(),
            key_prefix: String::new(),
        }
    }
}

/// Bounds the moka cache; counters are not counted against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryCacheConfig {
    pub max_capacity: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 100_000,
        }
    }
}
