//! In-memory LRU result store.
//!
//! Fast and process-local. Entries are lost on restart and the least
//! recently used entry is dropped once the capacity is reached.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;

use crate::error::StorageResult;
use crate::store::ResultStore;

/// Result store backed by a bounded LRU map.
pub struct MemoryResultStore {
    cache: Mutex<LruCache<String, Bytes>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryResultStore {
    /// Create a store holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// (hits, misses) since creation.
    pub fn hit_counts(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        let mut cache = self.cache.lock().await;
        match cache.get(key) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value.clone()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Bytes) -> StorageResult<()> {
        self.cache.lock().await.put(key.to_string(), value);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.cache.lock().await.contains(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        Ok(self.cache.lock().await.pop(key).is_some())
    }

    async fn clear(&self) -> StorageResult<u64> {
        let mut cache = self.cache.lock().await;
        let count = cache.len() as u64;
        cache.clear();
        Ok(count)
    }
}
