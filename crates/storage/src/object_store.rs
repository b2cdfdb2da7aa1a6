//! Object storage result store (local filesystem or S3 compatible).

use std::path::Path as FsPath;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{aws::AmazonS3Builder, local::LocalFileSystem, path::Path, ObjectStore};
use tracing::{debug, instrument};

use crate::config::ObjectStorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::store::ResultStore;

/// Directory (or key prefix) holding result objects.
const RESULT_PREFIX: &str = "watersheds";

/// Result store writing one JSON object per key.
///
/// Keys contain characters that are awkward in file and object names, so
/// each key is hex-encoded into the object name.
pub struct ObjectResultStore {
    store: Arc<dyn ObjectStore>,
    prefix: Path,
    backend: &'static str,
}

impl ObjectResultStore {
    /// Store results under `dir/watersheds/` on the local filesystem.
    pub fn local(dir: &FsPath) -> StorageResult<Self> {
        std::fs::create_dir_all(dir.join(RESULT_PREFIX))?;
        let store = LocalFileSystem::new_with_prefix(dir).map_err(|e| {
            StorageError::connection(format!("Failed to open {}: {}", dir.display(), e))
        })?;
        Ok(Self::from_store(Arc::new(store), "filesystem"))
    }

    /// Store results in an S3/MinIO bucket.
    pub fn s3(config: &ObjectStorageConfig) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region);

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::connection(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self::from_store(Arc::new(store), "s3"))
    }

    /// Wrap an existing object store.
    pub fn from_store(store: Arc<dyn ObjectStore>, backend: &'static str) -> Self {
        Self {
            store,
            prefix: Path::from(RESULT_PREFIX),
            backend,
        }
    }

    fn location(&self, key: &str) -> Path {
        self.prefix.child(format!("{}.json", encode_key(key)))
    }
}

/// Hex-encode a cache key into a file-name-safe string.
pub fn encode_key(key: &str) -> String {
    key.bytes().map(|b| format!("{:02x}", b)).collect()
}

#[async_trait]
impl ResultStore for ObjectResultStore {
    fn name(&self) -> &'static str {
        self.backend
    }

    #[instrument(skip(self), fields(backend = self.backend))]
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        let location = self.location(key);

        let result = match self.store.get(&location).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => {
                return Err(StorageError::read(format!(
                    "Failed to read {}: {}",
                    location, e
                )))
            }
        };

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::read(format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read stored result");
        Ok(Some(bytes))
    }

    #[instrument(skip(self, value), fields(backend = self.backend))]
    async fn set(&self, key: &str, value: Bytes) -> StorageResult<()> {
        let location = self.location(key);
        debug!(size = value.len(), "Writing stored result");

        self.store
            .put(&location, value.into())
            .await
            .map_err(|e| StorageError::write(format!("Failed to write {}: {}", location, e)))?;

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let location = self.location(key);

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::read(format!(
                "Failed to check {}: {}",
                location, e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        if !self.exists(key).await? {
            return Ok(false);
        }

        let location = self.location(key);
        self.store
            .delete(&location)
            .await
            .map_err(|e| StorageError::write(format!("Failed to delete {}: {}", location, e)))?;

        Ok(true)
    }

    #[instrument(skip(self), fields(backend = self.backend))]
    async fn clear(&self) -> StorageResult<u64> {
        let mut locations = Vec::new();
        let mut stream = self.store.list(Some(&self.prefix));
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| StorageError::read(format!("List failed: {}", e)))?
        {
            if meta.location.extension() == Some("json") {
                locations.push(meta.location);
            }
        }

        let mut count = 0u64;
        for location in locations {
            self.store
                .delete(&location)
                .await
                .map_err(|e| StorageError::write(format!("Failed to delete {}: {}", location, e)))?;
            count += 1;
        }

        debug!(count, "Cleared stored results");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("a|b"), "617c62");
        assert_ne!(
            encode_key("38.880000,-77.020000|snap=true|r=100"),
            encode_key("38.880000,-77.020000|snap=false|r=0")
        );
    }

    #[tokio::test]
    async fn test_in_memory_object_store() {
        let store = ObjectResultStore::from_store(Arc::new(InMemory::new()), "memory-object");
        let key = "38.880000,-77.020000|snap=true|r=100";

        assert!(store.get(key).await.unwrap().is_none());
        store.set(key, Bytes::from_static(b"{\"a\":1}")).await.unwrap();
        assert_eq!(
            store.get(key).await.unwrap(),
            Some(Bytes::from_static(b"{\"a\":1}"))
        );
        assert!(store.exists(key).await.unwrap());
        assert!(store.delete(key).await.unwrap());
        assert!(!store.delete(key).await.unwrap());
    }

    #[tokio::test]
    async fn test_local_store_persists_and_clears() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = ObjectResultStore::local(dir.path()).unwrap();
            store.set("k1", Bytes::from_static(b"1")).await.unwrap();
            store.set("k2", Bytes::from_static(b"2")).await.unwrap();
        }

        let file = dir
            .path()
            .join(RESULT_PREFIX)
            .join(format!("{}.json", encode_key("k1")));
        assert!(file.exists());

        // A fresh store sees entries written by the previous one
        let store = ObjectResultStore::local(dir.path()).unwrap();
        assert_eq!(store.name(), "filesystem");
        assert_eq!(store.get("k2").await.unwrap(), Some(Bytes::from_static(b"2")));

        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(store.get("k1").await.unwrap().is_none());
        assert_eq!(store.clear().await.unwrap(), 0);
    }
}
