//! Single-node ephemeral store on moka. Strings and counters share one
//! cache, each entry expiring at its own deadline.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use tracing::debug;

use keyward_core::config::cache::MemoryCacheConfig;
use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::traits::cache::CacheProvider;

#[derive(Debug, Clone)]
enum Stored {
    Text(String),
    Counter(i64),
}

/// A value and the instant it dies. `None` lives until evicted for space.
#[derive(Debug, Clone)]
struct Slot {
    stored: Stored,
    deadline: Option<Instant>,
}

impl Slot {
    fn text(value: &str, ttl: Duration) -> Self {
        Self {
            stored: Stored::Text(value.to_string()),
            deadline: deadline_after(ttl),
        }
    }

    fn render(&self) -> String {
        match &self.stored {
            Stored::Text(value) => value.clone(),
            Stored::Counter(n) => n.to_string(),
        }
    }

    /// Strings holding an integer count like Redis does.
    fn incremented(self) -> AppResult<Self> {
        let current = match &self.stored {
            Stored::Counter(n) => *n,
            Stored::Text(value) => value
                .parse::<i64>()
                .map_err(|_| AppError::cache("Value is not an integer"))?,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| AppError::cache("Increment would overflow"))?;
        Ok(Self {
            stored: Stored::Counter(next),
            deadline: self.deadline,
        })
    }
}

fn deadline_after(ttl: Duration) -> Option<Instant> {
    Instant::now().checked_add(ttl)
}

/// Expires every entry at its slot's deadline, on insert and on update.
struct UntilDeadline;

impl UntilDeadline {
    fn remaining(slot: &Slot, at: Instant) -> Option<Duration> {
        slot.deadline.map(|deadline| deadline.saturating_duration_since(at))
    }
}

impl Expiry<String, Slot> for UntilDeadline {
    fn expire_after_create(&self, _key: &String, slot: &Slot, created_at: Instant) -> Option<Duration> {
        Self::remaining(slot, created_at)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        slot: &Slot,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Self::remaining(slot, updated_at)
    }
}

/// Process-local [`CacheProvider`]. Clones share state.
///
/// Read-modify-write operations go through moka's per-key compute lock,
/// so `incr` and `expire` are atomic and expired counters are evicted
/// like any other entry.
#[derive(Clone)]
pub struct MemoryCacheProvider {
    cache: Cache<String, Slot>,
}

impl std::fmt::Debug for MemoryCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheProvider")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl MemoryCacheProvider {
    pub fn new(config: &MemoryCacheConfig) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(config.max_capacity)
                .expire_after(UntilDeadline)
                .build(),
        }
    }

    /// Adds one; a fresh counter gets `ttl` as its deadline, an existing
    /// one keeps whatever deadline it has unless it has none.
    async fn bump(&self, key: &str, ttl: Option<Duration>) -> AppResult<i64> {
        let result = self
            .cache
            .entry(key.to_string())
            .and_try_compute_with(|current| {
                let next = match current {
                    Some(entry) => entry.into_value().incremented(),
                    None => Ok(Slot {
                        stored: Stored::Counter(1),
                        deadline: None,
                    }),
                };
                let next = next.map(|mut slot| {
                    if slot.deadline.is_none() {
                        slot.deadline = ttl.and_then(deadline_after);
                    }
                    Op::Put(slot)
                });
                std::future::ready(next)
            })
            .await?;

        match result.into_entry().map(|entry| entry.into_value().stored) {
            Some(Stored::Counter(n)) => Ok(n),
            _ => Err(AppError::internal("Counter update was not stored")),
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache.get(key).await.map(|slot| slot.render()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.cache.insert(key.to_string(), Slot::text(value, ttl)).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.remove(key).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        // `contains_key` does not check expiry; `get` does.
        Ok(self.cache.get(key).await.is_some())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let entry = self
            .cache
            .entry(key.to_string())
            .or_insert_with(async { Slot::text(value, ttl) })
            .await;
        Ok(entry.is_fresh())
    }

    async fn incr(&self, key: &str) -> AppResult<i64> {
        self.bump(key, None).await
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> AppResult<i64> {
        self.bump(key, Some(ttl)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) => Op::Put(Slot {
                        deadline: deadline_after(ttl),
                        ..entry.into_value()
                    }),
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
        Ok(matches!(result, CompResult::ReplacedWith(_)))
    }

    async fn set_many(&self, entries: &[(String, String, Duration)]) -> AppResult<()> {
        for (key, value, ttl) in entries {
            self.set(key, value, *ttl).await?;
        }
        debug!(count = entries.len(), "Stored batch");
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> AppResult<u64> {
        let mut removed = 0u64;
        for key in keys {
            if self.cache.remove(key.as_str()).await.is_some() {
                removed += 1;
            }
        }
        debug!(requested = keys.len(), removed, "Deleted batch");
        Ok(removed)
    }

    async fn exists_any(&self, keys: &[String]) -> AppResult<bool> {
        for key in keys {
            if self.exists(key).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
