//! Zarr V3 grid set implementation.

use std::path::Path;
use std::sync::Arc;

use projection::CrsCode;
use tracing::{debug, instrument};
use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;
use zarrs_storage::ReadableStorageTraits;

use crate::cache::{ChunkCache, SharedChunkCache};
use crate::config::TerrainGridConfig;
use crate::error::{GridError, Result};
use crate::types::{GeoTransform, GridLayer, GridMetadata, GridWindow, PixelWindow};

use super::GridSource;

/// One opened Zarr array of a grid set.
pub struct ZarrLayer<S: ReadableStorageTraits> {
    /// The Zarr array.
    array: Array<S>,
    /// Stable grid name, used in logs and for chunk cache keys.
    path: String,
    /// Metadata extracted from the array attributes.
    metadata: GridMetadata,
    /// Nodata sentinel from attributes or the array fill value.
    nodata: Option<f32>,
}

impl<S: ReadableStorageTraits + 'static> ZarrLayer<S> {
    /// Open a Zarr array from storage and parse its terrain attributes.
    ///
    /// # Arguments
    /// * `storage` - The storage backend
    /// * `array_path` - Path to the Zarr array inside the store
    /// * `label` - Stable name of the grid, used for the chunk cache key
    pub fn open(storage: S, array_path: &str, label: &str) -> Result<Self> {
        let array = Array::open(Arc::new(storage), array_path)
            .map_err(|e| GridError::open_failed(format!("{}: {}", label, e)))?;

        let (metadata, nodata) = Self::extract_metadata(&array)?;

        Ok(Self {
            array,
            path: label.to_string(),
            metadata,
            nodata,
        })
    }

    /// Metadata of this layer.
    pub fn metadata(&self) -> &GridMetadata {
        &self.metadata
    }

    /// Nodata sentinel of this layer.
    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    /// Extract grid metadata from Zarr array attributes.
    fn extract_metadata(array: &Array<S>) -> Result<(GridMetadata, Option<f32>)> {
        let attrs = array.attributes();
        let shape = array.shape();

        if shape.len() != 2 {
            return Err(GridError::invalid_metadata(format!(
                "array must have 2 dimensions, found {}",
                shape.len()
            )));
        }

        if array.data_type() != &DataType::Float32 {
            return Err(GridError::invalid_metadata(format!(
                "array data type must be float32, found {:?}",
                array.data_type()
            )));
        }

        // Use origin [0, 0] for getting chunk shape
        let origin = vec![0u64; shape.len()];
        let chunk_shape = array
            .chunk_grid()
            .chunk_shape(&origin, shape)
            .map_err(|e| GridError::invalid_metadata(e.to_string()))?
            .ok_or_else(|| GridError::invalid_metadata("missing chunk shape"))?;
        let chunk_shape = (chunk_shape[1].get() as usize, chunk_shape[0].get() as usize);

        let crs = match attrs.get("crs").and_then(|v| v.as_str()) {
            Some(code) => CrsCode::parse(code)?,
            None => CrsCode::default(),
        };

        let transform = attrs
            .get("geo_transform")
            .and_then(|v| v.as_array())
            .and_then(|arr| {
                if arr.len() != 6 {
                    return None;
                }
                let mut t = [0.0; 6];
                for (slot, value) in t.iter_mut().zip(arr) {
                    *slot = value.as_f64()?;
                }
                Some(GeoTransform(t))
            })
            .ok_or_else(|| {
                GridError::invalid_metadata("geo_transform attribute missing or malformed")
            })?;

        // Explicit attribute wins, otherwise a non-NaN fill value
        let fill_value = array
            .fill_value()
            .as_ne_bytes()
            .try_into()
            .map(f32::from_ne_bytes)
            .unwrap_or(f32::NAN);
        let nodata = attrs
            .get("nodata")
            .and_then(|v| v.as_f64())
            .map(|v| v as f32)
            .or(if fill_value.is_nan() { None } else { Some(fill_value) });

        // Zarr is [rows, cols]
        let metadata = GridMetadata {
            width: shape[1] as usize,
            height: shape[0] as usize,
            transform,
            crs,
            chunk_shape,
        };

        Ok((metadata, nodata))
    }

    /// Read and decompress a single chunk (synchronous).
    fn read_chunk_uncached(&self, chunk_x: usize, chunk_y: usize) -> Result<Vec<f32>> {
        let (chunk_w, chunk_h) = self.metadata.chunk_shape;
        let (grid_w, grid_h) = (self.metadata.width, self.metadata.height);

        // Calculate actual chunk bounds (may be partial at edges)
        let start_col = chunk_x * chunk_w;
        let start_row = chunk_y * chunk_h;
        let actual_w = (start_col + chunk_w).min(grid_w) - start_col;
        let actual_h = (start_row + chunk_h).min(grid_h) - start_row;

        // Zarr uses [row, col] indexing
        let subset = ArraySubset::new_with_start_shape(
            vec![start_row as u64, start_col as u64],
            vec![actual_h as u64, actual_w as u64],
        )
        .map_err(|e| GridError::read_failed(e.to_string()))?;

        self.array
            .retrieve_array_subset_elements::<f32>(&subset)
            .map_err(|e| GridError::read_failed(format!("{}: {}", self.path, e)))
    }

    /// Read a chunk through the shared cache.
    fn read_chunk(
        &self,
        cache: &SharedChunkCache,
        chunk_x: usize,
        chunk_y: usize,
    ) -> Result<Arc<Vec<f32>>> {
        let cache_key = {
            let mut cache = cache.lock().unwrap_or_else(|e| e.into_inner());
            let key = (cache.array_id(&self.path), chunk_x, chunk_y);
            if let Some(data) = cache.get(&key) {
                return Ok(data);
            }
            key
        };

        // Decode without holding the lock
        let data = Arc::new(self.read_chunk_uncached(chunk_x, chunk_y)?);

        {
            let mut cache = cache.lock().unwrap_or_else(|e| e.into_inner());
            cache.insert(cache_key, Arc::clone(&data));
        }

        Ok(data)
    }

    /// Read a window by assembling every chunk that intersects it.
    fn read_window(&self, cache: &SharedChunkCache, window: PixelWindow) -> Result<GridWindow> {
        let window = window.clip(self.metadata.width, self.metadata.height);
        if window.is_empty() {
            return Ok(GridWindow::new(window, Vec::new(), self.nodata));
        }

        let (chunk_w, chunk_h) = self.metadata.chunk_shape;
        let grid_w = self.metadata.width;
        let grid_h = self.metadata.height;

        let min_chunk_x = window.col / chunk_w;
        let max_chunk_x = (window.end_col() - 1) / chunk_w;
        let min_chunk_y = window.row / chunk_h;
        let max_chunk_y = (window.end_row() - 1) / chunk_h;

        let mut output = vec![f32::NAN; window.len()];

        for cy in min_chunk_y..=max_chunk_y {
            for cx in min_chunk_x..=max_chunk_x {
                let chunk = self.read_chunk(cache, cx, cy)?;

                // Chunk bounds in grid coordinates
                let chunk_start_col = cx * chunk_w;
                let chunk_start_row = cy * chunk_h;
                let chunk_actual_w = chunk_w.min(grid_w - chunk_start_col);
                let chunk_actual_h = chunk_h.min(grid_h - chunk_start_row);

                // Overlap between chunk and window
                let start_col = window.col.max(chunk_start_col);
                let end_col = window.end_col().min(chunk_start_col + chunk_actual_w);
                let start_row = window.row.max(chunk_start_row);
                let end_row = window.end_row().min(chunk_start_row + chunk_actual_h);

                if start_col >= end_col || start_row >= end_row {
                    continue;
                }

                let span = end_col - start_col;
                for row in start_row..end_row {
                    let src = (row - chunk_start_row) * chunk_actual_w + (start_col - chunk_start_col);
                    let dst = (row - window.row) * window.width + (start_col - window.col);
                    if src + span <= chunk.len() {
                        output[dst..dst + span].copy_from_slice(&chunk[src..src + span]);
                    }
                }
            }
        }

        Ok(GridWindow::new(window, output, self.nodata))
    }
}

/// Grid set backed by three aligned Zarr arrays sharing one chunk cache.
///
/// Reads only the chunks intersecting a requested window and keeps
/// decompressed chunks in a memory-bounded LRU, so repeated traces over the
/// same drainage reuse decoded data across requests.
pub struct ZarrGridSet<S: ReadableStorageTraits> {
    elevation: ZarrLayer<S>,
    flow_dir: ZarrLayer<S>,
    flow_acc: ZarrLayer<S>,
    chunk_cache: SharedChunkCache,
}

impl<S: ReadableStorageTraits + 'static> ZarrGridSet<S> {
    /// Combine three opened layers, checking that they are aligned.
    pub fn from_layers(
        elevation: ZarrLayer<S>,
        flow_dir: ZarrLayer<S>,
        flow_acc: ZarrLayer<S>,
        chunk_cache: SharedChunkCache,
    ) -> Result<Self> {
        for other in [&flow_dir, &flow_acc] {
            if !elevation.metadata.is_aligned_with(&other.metadata) {
                return Err(GridError::misaligned(format!(
                    "{} ({}x{}, {:?}, {}) does not match {} ({}x{}, {:?}, {})",
                    other.path,
                    other.metadata.width,
                    other.metadata.height,
                    other.metadata.transform.0,
                    other.metadata.crs,
                    elevation.path,
                    elevation.metadata.width,
                    elevation.metadata.height,
                    elevation.metadata.transform.0,
                    elevation.metadata.crs,
                )));
            }
        }

        Ok(Self {
            elevation,
            flow_dir,
            flow_acc,
            chunk_cache,
        })
    }

    fn layer(&self, layer: GridLayer) -> &ZarrLayer<S> {
        match layer {
            GridLayer::Elevation => &self.elevation,
            GridLayer::FlowDirection => &self.flow_dir,
            GridLayer::FlowAccumulation => &self.flow_acc,
        }
    }

    /// The chunk cache used by this grid set.
    pub fn chunk_cache(&self) -> &SharedChunkCache {
        &self.chunk_cache
    }
}

impl ZarrGridSet<FilesystemStore> {
    /// Open the three grids named by the configuration from local Zarr
    /// directories.
    #[instrument(skip_all, fields(dem = %config.dem_path.display()))]
    pub fn open_filesystem(config: &TerrainGridConfig, chunk_cache: SharedChunkCache) -> Result<Self> {
        let elevation = open_filesystem_layer(config.path_for(GridLayer::Elevation))?;
        let flow_dir = open_filesystem_layer(config.path_for(GridLayer::FlowDirection))?;
        let flow_acc = open_filesystem_layer(config.path_for(GridLayer::FlowAccumulation))?;

        let set = Self::from_layers(elevation, flow_dir, flow_acc, chunk_cache)?;
        let meta = set.metadata();
        debug!(
            width = meta.width,
            height = meta.height,
            crs = %meta.crs,
            chunk_w = meta.chunk_shape.0,
            chunk_h = meta.chunk_shape.1,
            "Opened terrain grid set"
        );
        Ok(set)
    }

    /// Open with a fresh chunk cache sized by the configuration.
    pub fn open_with_config(config: &TerrainGridConfig) -> Result<Self> {
        Self::open_filesystem(config, ChunkCache::shared(config.chunk_cache_size_bytes()))
    }
}

/// Open a Zarr array stored at the root of a local directory.
pub(crate) fn open_filesystem_layer(path: &Path) -> Result<ZarrLayer<FilesystemStore>> {
    if !path.exists() {
        return Err(GridError::NotFound(path.display().to_string()));
    }
    let store = FilesystemStore::new(path)
        .map_err(|e| GridError::open_failed(format!("{}: {}", path.display(), e)))?;
    ZarrLayer::open(store, "/", &path.display().to_string())
}

impl<S: ReadableStorageTraits + 'static> GridSource for ZarrGridSet<S> {
    fn metadata(&self) -> &GridMetadata {
        &self.elevation.metadata
    }

    fn nodata(&self, layer: GridLayer) -> Option<f32> {
        self.layer(layer).nodata
    }

    fn read_window(&self, layer: GridLayer, window: PixelWindow) -> Result<GridWindow> {
        self.layer(layer).read_window(&self.chunk_cache, window)
    }
}
