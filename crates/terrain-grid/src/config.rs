//! Configuration for terrain grid access.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::GridLayer;

/// Configuration for the terrain grid set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainGridConfig {
    /// Zarr array directory holding the conditioned elevation grid.
    pub dem_path: PathBuf,

    /// Zarr array directory holding D8 flow-direction codes.
    pub flow_dir_path: PathBuf,

    /// Zarr array directory holding flow-accumulation counts.
    pub flow_acc_path: PathBuf,

    /// Memory budget for the chunk cache in megabytes.
    pub chunk_cache_size_mb: usize,

    /// Edge length of the tiles fetched while tracing and sampling elevation.
    pub trace_tile_size: usize,

    /// Chunk dimension for Zarr files written by this crate (square chunks).
    pub zarr_chunk_size: usize,

    /// Compression codec for Zarr files.
    pub zarr_compression: ZarrCompression,

    /// Compression level (1-9).
    pub zarr_compression_level: u8,

    /// Enable byte shuffle filter for better compression.
    pub zarr_shuffle: bool,
}

impl Default for TerrainGridConfig {
    fn default() -> Self {
        Self {
            dem_path: PathBuf::from("./data/processed/dem/filled_dem.zarr"),
            flow_dir_path: PathBuf::from("./data/processed/dem/flow_direction.zarr"),
            flow_acc_path: PathBuf::from("./data/processed/dem/flow_accumulation.zarr"),
            chunk_cache_size_mb: 256,
            trace_tile_size: 256,
            zarr_chunk_size: 512,
            zarr_compression: ZarrCompression::BloscZstd,
            zarr_compression_level: 1,
            zarr_shuffle: true,
        }
    }
}

impl TerrainGridConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("DEM_PATH") {
            config.dem_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("FLOW_DIR_PATH") {
            config.flow_dir_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("FLOW_ACC_PATH") {
            config.flow_acc_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("CHUNK_CACHE_SIZE_MB") {
            if let Ok(size) = val.parse() {
                config.chunk_cache_size_mb = size;
            }
        }

        if let Ok(val) = std::env::var("TRACE_TILE_SIZE") {
            if let Ok(size) = val.parse() {
                config.trace_tile_size = size;
            }
        }

        if let Ok(val) = std::env::var("ZARR_CHUNK_SIZE") {
            if let Ok(size) = val.parse() {
                config.zarr_chunk_size = size;
            }
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION") {
            config.zarr_compression = ZarrCompression::from_str(&val);
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                config.zarr_compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("ZARR_SHUFFLE") {
            config.zarr_shuffle = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_cache_size_mb == 0 {
            return Err("chunk_cache_size_mb must be > 0".to_string());
        }

        if self.trace_tile_size < 8 {
            return Err("trace_tile_size must be >= 8".to_string());
        }

        if self.zarr_chunk_size == 0 {
            return Err("zarr_chunk_size must be > 0".to_string());
        }

        if self.zarr_compression_level == 0 || self.zarr_compression_level > 9 {
            return Err("zarr_compression_level must be 1-9".to_string());
        }

        Ok(())
    }

    /// Get the chunk cache size in bytes.
    pub fn chunk_cache_size_bytes(&self) -> usize {
        self.chunk_cache_size_mb * 1024 * 1024
    }

    /// Path of the Zarr array backing a layer.
    pub fn path_for(&self, layer: GridLayer) -> &PathBuf {
        match layer {
            GridLayer::Elevation => &self.dem_path,
            GridLayer::FlowDirection => &self.flow_dir_path,
            GridLayer::FlowAccumulation => &self.flow_acc_path,
        }
    }
}

/// Compression codec for Zarr files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZarrCompression {
    /// No compression.
    None,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd (recommended).
    BloscZstd,
}

impl Default for ZarrCompression {
    fn default() -> Self {
        Self::BloscZstd
    }
}

impl ZarrCompression {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => Self::None,
            "lz4" | "blosc_lz4" => Self::BloscLz4,
            "zstd" | "blosc_zstd" => Self::BloscZstd,
            _ => Self::BloscZstd,
        }
    }

    /// Get the codec name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl std::fmt::Display for ZarrCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TerrainGridConfig::default();
        assert_eq!(config.chunk_cache_size_mb, 256);
        assert_eq!(config.trace_tile_size, 256);
        assert_eq!(config.zarr_chunk_size, 512);
        assert_eq!(config.zarr_compression, ZarrCompression::BloscZstd);
        assert_eq!(config.zarr_compression_level, 1);
        assert!(config.zarr_shuffle);
        assert!(config
            .path_for(GridLayer::FlowDirection)
            .ends_with("flow_direction.zarr"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = TerrainGridConfig::default();
        assert!(config.validate().is_ok());

        config.chunk_cache_size_mb = 0;
        assert!(config.validate().is_err());

        config = TerrainGridConfig::default();
        config.trace_tile_size = 4;
        assert!(config.validate().is_err());

        config = TerrainGridConfig::default();
        config.zarr_compression_level = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zarr_compression_from_str() {
        assert_eq!(ZarrCompression::from_str("none"), ZarrCompression::None);
        assert_eq!(ZarrCompression::from_str("lz4"), ZarrCompression::BloscLz4);
        assert_eq!(
            ZarrCompression::from_str("BLOSC_ZSTD"),
            ZarrCompression::BloscZstd
        );
        assert_eq!(
            ZarrCompression::from_str("invalid"),
            ZarrCompression::BloscZstd
        );
    }
}
