//! Zarr V3 writer for terrain grids.
//!
//! Grid provisioning happens offline; this writer stores already
//! conditioned rasters with the attributes [`ZarrLayer`](crate::ZarrLayer)
//! expects (`crs`, `geo_transform`, `nodata`).

use std::path::Path;
use std::sync::Arc;

use projection::CrsCode;
use tracing::debug;
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;
use zarrs_storage::{ReadableStorageTraits, WritableStorageTraits};

use crate::config::{TerrainGridConfig, ZarrCompression};
use crate::error::{GridError, Result};
use crate::source::GridSource;
use crate::types::{GeoTransform, GridLayer};

/// Result of writing a Zarr array.
#[derive(Debug)]
pub struct GridWriteResult {
    /// Grid dimensions (width, height).
    pub shape: (usize, usize),
    /// Chunk dimensions.
    pub chunk_shape: (usize, usize),
    /// Compression codec used.
    pub compression: String,
    /// Total bytes written (uncompressed).
    pub bytes_written: u64,
}

/// Writer for creating Zarr V3 arrays from terrain rasters.
pub struct TerrainGridWriter {
    config: TerrainGridConfig,
}

impl TerrainGridWriter {
    /// Create a new writer with the given configuration.
    pub fn new(config: TerrainGridConfig) -> Self {
        Self { config }
    }

    /// Write one raster to a Zarr array.
    ///
    /// # Arguments
    /// * `storage` - The storage backend to write to (must be readable AND writable)
    /// * `path` - Path for the Zarr array (e.g., "/")
    /// * `data` - Grid data in row-major order (north to south, west to east)
    /// * `width` - Grid width (number of columns)
    /// * `height` - Grid height (number of rows)
    /// * `transform` - Pixel-to-CRS affine transform
    /// * `crs` - CRS of the transform
    /// * `nodata` - Nodata sentinel, if any besides NaN
    #[allow(clippy::too_many_arguments)]
    pub fn write<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
        &self,
        storage: S,
        path: &str,
        data: &[f32],
        width: usize,
        height: usize,
        transform: &GeoTransform,
        crs: CrsCode,
        nodata: Option<f32>,
    ) -> Result<GridWriteResult> {
        if data.len() != width * height {
            return Err(GridError::ConfigError(format!(
                "data has {} values for a {}x{} grid",
                data.len(),
                width,
                height
            )));
        }

        let chunk_size = self.config.zarr_chunk_size.min(width.max(height)).max(1);

        let mut attrs = serde_json::Map::new();
        attrs.insert("crs".to_string(), serde_json::json!(crs.as_str()));
        attrs.insert("geo_transform".to_string(), serde_json::json!(transform.0));
        attrs.insert("nodata".to_string(), serde_json::json!(nodata));

        let chunk_grid: zarrs::array::ChunkGrid = vec![chunk_size as u64, chunk_size as u64]
            .try_into()
            .map_err(|e| GridError::ConfigError(format!("{:?}", e)))?;

        let mut builder = ArrayBuilder::new(
            vec![height as u64, width as u64], // shape [rows, cols]
            DataType::Float32,
            chunk_grid,
            FillValue::from(f32::NAN),
        );
        builder.attributes(attrs);

        if self.config.zarr_compression != ZarrCompression::None {
            builder.bytes_to_bytes_codecs(vec![self.create_compression_codec()?]);
        }

        let array = builder
            .build(Arc::new(storage), path)
            .map_err(|e| GridError::storage_error(e.to_string()))?;

        array
            .store_metadata()
            .map_err(|e| GridError::storage_error(e.to_string()))?;

        let subset =
            ArraySubset::new_with_start_shape(vec![0, 0], vec![height as u64, width as u64])
                .map_err(|e| GridError::storage_error(e.to_string()))?;

        array
            .store_array_subset_elements(&subset, data)
            .map_err(|e| GridError::storage_error(e.to_string()))?;

        Ok(GridWriteResult {
            shape: (width, height),
            chunk_shape: (chunk_size, chunk_size),
            compression: self.config.zarr_compression.as_str().to_string(),
            bytes_written: (data.len() * std::mem::size_of::<f32>()) as u64,
        })
    }

    /// Write all three layers of a grid source into `dir`, one Zarr
    /// directory per layer.
    ///
    /// Returns a copy of the writer's configuration pointing at the new
    /// grids, ready for [`ZarrGridSet::open_with_config`](crate::ZarrGridSet::open_with_config).
    pub fn write_grid_set(&self, dir: &Path, grids: &dyn GridSource) -> Result<TerrainGridConfig> {
        let meta = grids.metadata().clone();
        let mut config = self.config.clone();
        config.dem_path = dir.join("filled_dem.zarr");
        config.flow_dir_path = dir.join("flow_direction.zarr");
        config.flow_acc_path = dir.join("flow_accumulation.zarr");

        for layer in GridLayer::ALL {
            let path = config.path_for(layer);
            std::fs::create_dir_all(path)?;
            let store = FilesystemStore::new(path)
                .map_err(|e| GridError::storage_error(e.to_string()))?;

            let window = grids.read_window(layer, meta.full_window())?;
            let result = self.write(
                store,
                "/",
                &window.data,
                meta.width,
                meta.height,
                &meta.transform,
                meta.crs,
                grids.nodata(layer),
            )?;
            debug!(
                layer = %layer,
                path = %path.display(),
                bytes = result.bytes_written,
                "Wrote terrain grid"
            );
        }

        Ok(config)
    }

    /// Create the compression codec based on configuration.
    fn create_compression_codec(
        &self,
    ) -> Result<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.config.zarr_compression_level)
            .map_err(|_| GridError::ConfigError("Invalid compression level".to_string()))?;

        let shuffle = if self.config.zarr_shuffle {
            BloscShuffleMode::Shuffle
        } else {
            BloscShuffleMode::NoShuffle
        };

        // typesize is required when shuffle is enabled
        let typesize = if self.config.zarr_shuffle {
            Some(4) // f32 = 4 bytes
        } else {
            None
        };

        let compressor = match self.config.zarr_compression {
            ZarrCompression::None => {
                return Err(GridError::ConfigError(
                    "No compression configured".to_string(),
                ))
            }
            ZarrCompression::BloscLz4 => BloscCompressor::LZ4,
            ZarrCompression::BloscZstd => BloscCompressor::Zstd,
        };

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(|e| GridError::ConfigError(e.to_string()))?;

        Ok(Arc::new(codec))
    }
}
