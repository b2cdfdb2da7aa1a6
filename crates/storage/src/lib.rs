//! Result storage for the watershed services.
//!
//! Provides one key-value interface ([`ResultStore`]) over:
//! - An in-process LRU map
//! - Object storage (local filesystem or MinIO/S3)
//! - Redis

pub mod config;
pub mod error;
pub mod memory;
pub mod object_store;
pub mod redis_store;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

pub use self::object_store::ObjectResultStore;
pub use config::{CacheBackend, ObjectStorageConfig, ResultStoreConfig};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryResultStore;
pub use redis_store::RedisResultStore;
pub use store::ResultStore;

/// Build the result store selected by the configuration.
pub async fn build_store(config: &ResultStoreConfig) -> StorageResult<Arc<dyn ResultStore>> {
    config.validate().map_err(StorageError::Config)?;

    let store: Arc<dyn ResultStore> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryResultStore::new(config.memory_entries)),
        CacheBackend::Filesystem => Arc::new(ObjectResultStore::local(&config.cache_dir)?),
        CacheBackend::S3 => Arc::new(ObjectResultStore::s3(&config.s3)?),
        CacheBackend::Redis => Arc::new(
            RedisResultStore::connect(&config.redis_url, config.ttl_secs.map(Duration::from_secs))
                .await?,
        ),
    };

    info!(backend = store.name(), "Result store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_memory_store() {
        let config = ResultStoreConfig {
            backend: CacheBackend::Memory,
            ..ResultStoreConfig::default()
        };
        let store = build_store(&config).await.unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[tokio::test]
    async fn test_build_filesystem_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = ResultStoreConfig {
            backend: CacheBackend::Filesystem,
            cache_dir: dir.path().join("cache"),
            ..ResultStoreConfig::default()
        };
        let store = build_store(&config).await.unwrap();
        assert_eq!(store.name(), "filesystem");
        assert!(dir.path().join("cache").join("watersheds").is_dir());
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        let config = ResultStoreConfig {
            backend: CacheBackend::Memory,
            memory_entries: 0,
            ..ResultStoreConfig::default()
        };
        assert!(matches!(
            build_store(&config).await,
            Err(StorageError::Config(_))
        ));
    }
}
