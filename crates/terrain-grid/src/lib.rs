//! Windowed access to co-registered terrain grids.
//!
//! A terrain grid set is three rasters sharing one extent, resolution and
//! alignment: conditioned elevation, D8 flow direction and flow
//! accumulation. Each is stored as a Float32 Zarr V3 array carrying its CRS,
//! GDAL-style geo-transform and nodata sentinel as attributes.
//!
//! # Architecture
//!
//! ```text
//! Delineation request
//!      │
//!      ▼
//! GridSource::read_window(layer, window)
//!      │
//!      ├─► Calculate intersecting chunks (O(1) arithmetic)
//!      │
//!      ├─► Check shared ChunkCache for each chunk
//!      │         │
//!      │         ├─► Cache hit: reuse decoded chunk
//!      │         │
//!      │         └─► Cache miss: decode from Zarr
//!      │
//!      └─► Assemble chunks into a GridWindow
//! ```
//!
//! # Example
//!
//! ```ignore
//! use terrain_grid::{GridLayer, GridSource, TerrainGridConfig, ZarrGridSet};
//!
//! let config = TerrainGridConfig::from_env();
//! let grids = ZarrGridSet::open_with_config(&config)?;
//!
//! let pixel = grids.lonlat_to_pixel(-77.02, 38.87).expect("inside the grid");
//! let acc = grids.read_window_around(GridLayer::FlowAccumulation, pixel, 5)?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod provider;
pub mod source;
pub mod status;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use cache::{ChunkCache, ChunkKey, SharedChunkCache};
pub use config::{TerrainGridConfig, ZarrCompression};
pub use error::{GridError, Result};
pub use provider::{GridProvider, StaticGridProvider, ZarrGridProvider};
pub use source::{GridSource, MemoryGridSet, ZarrGridSet, ZarrLayer};
pub use status::{probe_grids, GridSetStatus, GridStatus};
pub use types::{
    is_nodata, CacheStats, GeoTransform, GridLayer, GridMetadata, GridWindow, Pixel, PixelWindow,
};
pub use writer::{GridWriteResult, TerrainGridWriter};
