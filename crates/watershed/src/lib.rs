//! Watershed delineation engine.
//!
//! Computes the upstream contributing area draining to a clicked point from
//! precomputed D8 flow-direction and flow-accumulation grids.
//!
//! # Architecture
//!
//! ```text
//! DelineationRequest
//!      │
//!      ▼
//! PourPointResolver ── optional snap to max accumulation within radius
//!      │
//!      ▼
//! ResultCache::get_or_compute(key)
//!      │
//!      ├─► stored? ──────────────────────────────► DelineationResponse
//!      │
//!      └─► UpstreamTracer ─► CellMask ─► WatershedPolygonBuilder
//!                                            │
//!                                            └─► store ─► DelineationResponse
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use terrain_grid::{TerrainGridConfig, ZarrGridProvider};
//! use watershed::{DelineationConfig, DelineationRequest, DelineationService};
//!
//! let grids = Arc::new(ZarrGridProvider::new(TerrainGridConfig::from_env()));
//! let service = DelineationService::new(grids, None, DelineationConfig::from_env());
//!
//! let response = service
//!     .delineate(DelineationRequest::new(38.87, -77.02))
//!     .await?;
//! println!("{} km²", response.watershed.properties.stats.area_km2);
//! ```

pub mod cache;
pub mod config;
pub mod d8;
pub mod error;
pub mod geojson;
pub mod mask;
pub mod polygon;
pub mod resolver;
pub mod service;
pub mod stats;
pub mod tiles;
pub mod tracer;
pub mod types;

// Re-export commonly used types at crate root
pub use cache::{cache_key, CacheOutcome, ResultCache};
pub use config::DelineationConfig;
pub use d8::{D8Encoding, Direction};
pub use error::{DelineationError, ErrorKind, Result};
pub use geojson::{Feature, Geometry, Ring};
pub use mask::CellMask;
pub use polygon::WatershedPolygonBuilder;
pub use resolver::PourPointResolver;
pub use service::{DelineationService, ServiceStatus, Stage};
pub use stats::ElevationStats;
pub use tracer::UpstreamTracer;
pub use types::{
    CacheEntry, DelineationRequest, DelineationResponse, PourPoint, PourPointProperties,
    ResponseMetadata, Watershed, WatershedProperties, WatershedStats,
};
