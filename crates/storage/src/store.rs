//! The key-value interface every result backend implements.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageResult;

/// Key-value store for serialized delineation results.
///
/// Keys are opaque strings; backends map them to their own naming scheme.
/// Values are immutable once written; a `set` on an existing key replaces
/// it.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Short backend name for status reports and logs.
    fn name(&self) -> &'static str;

    /// Fetch a stored value.
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>>;

    /// Store a value.
    async fn set(&self, key: &str, value: Bytes) -> StorageResult<()>;

    /// Check whether a key is present.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Remove a key. Returns whether it was present.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Remove every stored value. Returns the number removed.
    async fn clear(&self) -> StorageResult<u64>;
}
