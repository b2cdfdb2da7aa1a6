//! Redis-backed result store.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use tracing::{debug, instrument};

use crate::error::{StorageError, StorageResult};
use crate::store::ResultStore;

/// Namespace for every key this store writes.
const KEY_PREFIX: &str = "watershed:";

/// Redis result store client.
pub struct RedisResultStore {
    conn: MultiplexedConnection,
    ttl: Option<Duration>,
}

impl RedisResultStore {
    /// Connect to Redis.
    pub async fn connect(redis_url: &str, ttl: Option<Duration>) -> StorageResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| StorageError::connection(format!("Redis connection failed: {}", e)))?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StorageError::connection(format!("Redis connection failed: {}", e)))?;

        Ok(Self { conn, ttl })
    }
}

/// Full Redis key for a cache key.
pub fn redis_key(key: &str) -> String {
    format!("{}{}", KEY_PREFIX, key)
}

#[async_trait]
impl ResultStore for RedisResultStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn
            .get(redis_key(key))
            .await
            .map_err(|e| StorageError::read(format!("Cache get failed: {}", e)))?;

        Ok(result.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes) -> StorageResult<()> {
        let mut conn = self.conn.clone();
        let key = redis_key(key);

        match self.ttl {
            Some(ttl) => conn
                .set_ex::<_, _, ()>(&key, value.as_ref(), ttl.as_secs())
                .await,
            None => conn.set::<_, _, ()>(&key, value.as_ref()).await,
        }
        .map_err(|e| StorageError::write(format!("Cache set failed: {}", e)))?;

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn
            .exists(redis_key(key))
            .await
            .map_err(|e| StorageError::read(format!("Cache exists check failed: {}", e)))?;

        Ok(exists)
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn
            .del(redis_key(key))
            .await
            .map_err(|e| StorageError::write(format!("Cache delete failed: {}", e)))?;

        Ok(removed > 0)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> StorageResult<u64> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(format!("{}*", KEY_PREFIX))
            .query_async(&mut conn)
            .await
            .map_err(|e| StorageError::read(format!("Pattern search failed: {}", e)))?;

        if keys.is_empty() {
            return Ok(0);
        }

        let count: u64 = conn
            .del(&keys)
            .await
            .map_err(|e| StorageError::write(format!("Delete failed: {}", e)))?;

        debug!(count, "Cleared stored results");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_key_namespaced() {
        assert_eq!(
            redis_key("38.880000,-77.020000|snap=false|r=0"),
            "watershed:38.880000,-77.020000|snap=false|r=0"
        );
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let result = RedisResultStore::connect("not-a-url", None).await;
        assert!(matches!(result, Err(StorageError::Connection(_))));
    }
}
