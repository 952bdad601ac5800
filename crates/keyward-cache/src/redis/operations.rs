//! Ephemeral store operations over Redis.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use keyward_core::error::{AppError, ErrorKind};
use keyward_core::result::AppResult;
use keyward_core::traits::cache::CacheProvider;

use super::client::RedisClient;

/// [`CacheProvider`] backed by Redis. Batches go through one atomic
/// pipeline.
#[derive(Debug, Clone)]
pub struct RedisCacheProvider {
    client: RedisClient,
}

impl RedisCacheProvider {
    /// Wrap a connected client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Namespaced key plus a connection handle.
    fn target(&self, key: &str) -> (String, ConnectionManager) {
        (self.client.prefixed_key(key), self.client.conn_mut())
    }
}

fn cache_err(e: redis::RedisError) -> AppError {
    AppError::with_source(ErrorKind::Cache, format!("Redis error: {e}"), e)
}

/// `TTL` answers -1 for a key without expiry; the script runs atomically
/// so no caller can observe the counter between the two writes.
const INCR_WITH_TTL: &str = r"
local count = redis.call('INCR', KEYS[1])
if redis.call('TTL', KEYS[1]) < 0 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
";

/// `SET EX` rejects a zero TTL, so round sub-second TTLs up.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let (key, mut conn) = self.target(key);
        conn.get(key).await.map_err(cache_err)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let (key, mut conn) = self.target(key);
        conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl))
            .await
            .map_err(cache_err)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let (key, mut conn) = self.target(key);
        conn.del::<_, ()>(key).await.map_err(cache_err)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let (key, mut conn) = self.target(key);
        conn.exists(key).await.map_err(cache_err)
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let (key, mut conn) = self.target(key);
        let stored: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(cache_err)?;
        Ok(stored.is_some())
    }

    async fn incr(&self, key: &str) -> AppResult<i64> {
        let (key, mut conn) = self.target(key);
        conn.incr(key, 1i64).await.map_err(cache_err)
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> AppResult<i64> {
        let (key, mut conn) = self.target(key);
        redis::Script::new(INCR_WITH_TTL)
            .key(key)
            .arg(ttl_secs(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(cache_err)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let (key, mut conn) = self.target(key);
        let secs = i64::try_from(ttl_secs(ttl)).unwrap_or(i64::MAX);
        conn.expire(key, secs).await.map_err(cache_err)
    }

    async fn set_many(&self, entries: &[(String, String, Duration)]) -> AppResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value, ttl) in entries {
            pipe.set_ex(self.client.prefixed_key(key), value, ttl_secs(*ttl))
                .ignore();
        }
        pipe.query_async::<()>(&mut self.client.conn_mut())
            .await
            .map_err(cache_err)?;
        debug!(count = entries.len(), "Stored batch in Redis");
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> AppResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let removed: u64 = self
            .client
            .conn_mut()
            .del(self.client.prefixed_keys(keys))
            .await
            .map_err(cache_err)?;
        debug!(requested = keys.len(), removed, "Deleted batch from Redis");
        Ok(removed)
    }

    async fn exists_any(&self, keys: &[String]) -> AppResult<bool> {
        if keys.is_empty() {
            return Ok(false);
        }
        // Multi-key EXISTS counts the keys present.
        let found: u64 = self
            .client
            .conn_mut()
            .exists(self.client.prefixed_keys(keys))
            .await
            .map_err(cache_err)?;
        Ok(found > 0)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let pong: String = redis::cmd("PING")
            .query_async(&mut self.client.conn_mut())
            .await
            .map_err(cache_err)?;
        Ok(pong == "PONG")
    }
}
