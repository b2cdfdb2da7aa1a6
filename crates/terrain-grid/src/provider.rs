//! Lazily opened grid sets.
//!
//! The service starts even when grids are not yet provisioned; a provider
//! opens them on first use and reports their status without computing
//! anything.

use std::sync::{Arc, RwLock};

use tracing::{info, warn};
use zarrs_filesystem::FilesystemStore;

use crate::cache::{ChunkCache, SharedChunkCache};
use crate::config::TerrainGridConfig;
use crate::error::Result;
use crate::source::{GridSource, ZarrGridSet};
use crate::status::{probe_grids, GridSetStatus, GridStatus};
use crate::types::{CacheStats, GridLayer};

/// Supplies the grid set used for delineation.
pub trait GridProvider: Send + Sync {
    /// The opened grid set. Blocking; call from the blocking pool.
    fn grids(&self) -> Result<Arc<dyn GridSource>>;

    /// Report whether the grids are present and readable.
    fn status(&self) -> GridSetStatus;

    /// Chunk cache statistics, if the provider caches chunks.
    fn cache_stats(&self) -> Option<CacheStats> {
        None
    }
}

/// Provider that opens the configured Zarr grids on first use and keeps
/// them open afterwards. A failed open is retried by the next caller.
pub struct ZarrGridProvider {
    config: TerrainGridConfig,
    chunk_cache: SharedChunkCache,
    opened: RwLock<Option<Arc<ZarrGridSet<FilesystemStore>>>>,
}

impl ZarrGridProvider {
    pub fn new(config: TerrainGridConfig) -> Self {
        let chunk_cache = ChunkCache::shared(config.chunk_cache_size_bytes());
        Self {
            config,
            chunk_cache,
            opened: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &TerrainGridConfig {
        &self.config
    }
}

impl GridProvider for ZarrGridProvider {
    fn grids(&self) -> Result<Arc<dyn GridSource>> {
        if let Some(set) = self.opened.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            return Ok(set.clone());
        }

        let mut slot = self.opened.write().unwrap_or_else(|e| e.into_inner());
        if let Some(set) = slot.as_ref() {
            return Ok(set.clone());
        }

        match ZarrGridSet::open_filesystem(&self.config, self.chunk_cache.clone()) {
            Ok(set) => {
                let meta = set.metadata();
                info!(
                    width = meta.width,
                    height = meta.height,
                    crs = %meta.crs,
                    "Terrain grids opened"
                );
                let set = Arc::new(set);
                *slot = Some(set.clone());
                Ok(set)
            }
            Err(e) => {
                warn!(error = %e, "Failed to open terrain grids");
                Err(e)
            }
        }
    }

    fn status(&self) -> GridSetStatus {
        probe_grids(&self.config)
    }

    fn cache_stats(&self) -> Option<CacheStats> {
        Some(self.chunk_cache.lock().unwrap_or_else(|e| e.into_inner()).stats())
    }
}

/// Provider around an already opened grid set.
pub struct StaticGridProvider {
    grids: Arc<dyn GridSource>,
    label: String,
}

impl StaticGridProvider {
    pub fn new(grids: Arc<dyn GridSource>, label: impl Into<String>) -> Self {
        Self {
            grids,
            label: label.into(),
        }
    }
}

impl GridProvider for StaticGridProvider {
    fn grids(&self) -> Result<Arc<dyn GridSource>> {
        Ok(self.grids.clone())
    }

    fn status(&self) -> GridSetStatus {
        GridSetStatus {
            grids: GridLayer::ALL
                .iter()
                .map(|&layer| GridStatus {
                    layer,
                    path: format!("{}:{}", self.label, layer),
                    exists: true,
                    readable: true,
                    error: None,
                })
                .collect(),
            ready: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GridError;
    use crate::source::MemoryGridSet;
    use crate::types::GeoTransform;
    use projection::CrsCode;

    #[test]
    fn test_zarr_provider_missing_grids() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TerrainGridConfig::default();
        config.dem_path = dir.path().join("dem.zarr");
        config.flow_dir_path = dir.path().join("fdir.zarr");
        config.flow_acc_path = dir.path().join("facc.zarr");

        let provider = ZarrGridProvider::new(config);
        assert!(matches!(provider.grids(), Err(GridError::NotFound(_))));
        assert!(!provider.status().ready);
        assert_eq!(provider.cache_stats().map(|s| s.entries), Some(0));
    }

    #[test]
    fn test_static_provider() {
        let grids = MemoryGridSet::new(2, 2, GeoTransform::north_up(0.0, 2.0, 1.0, 1.0), CrsCode::Epsg4326);
        let provider = StaticGridProvider::new(Arc::new(grids), "memory");
        assert!(provider.status().ready);
        assert_eq!(provider.grids().unwrap().metadata().width, 2);
        assert!(provider.cache_stats().is_none());
    }
}
