//! Request, result and response records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use terrain_grid::Pixel;

use crate::geojson::{Feature, Geometry};

/// A delineation request. Omitted options fall back to configured defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelineationRequest {
    /// Latitude in decimal degrees.
    pub lat: f64,

    /// Longitude in decimal degrees.
    pub lon: f64,

    #[serde(default)]
    pub snap_to_stream: Option<bool>,

    /// Snap radius in meters.
    #[serde(default)]
    pub snap_radius: Option<i64>,
}

impl DelineationRequest {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            snap_to_stream: None,
            snap_radius: None,
        }
    }

    pub fn with_snap(mut self, snap_to_stream: bool, snap_radius: i64) -> Self {
        self.snap_to_stream = Some(snap_to_stream);
        self.snap_radius = Some(snap_radius);
        self
    }

    pub fn without_snap(mut self) -> Self {
        self.snap_to_stream = Some(false);
        self
    }
}

/// The resolved outlet of a watershed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PourPoint {
    pub original_lon: f64,
    pub original_lat: f64,

    /// Resolved location: the click itself, or the snapped cell centre.
    pub lon: f64,
    pub lat: f64,

    pub snapped: bool,
    pub snap_distance_m: f64,

    /// Flow accumulation at the resolved cell (`None` for nodata).
    pub flow_accumulation: Option<f64>,

    pub pixel: Pixel,
}

/// Measurements of a watershed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatershedStats {
    pub area_km2: f64,
    pub area_mi2: f64,
    pub area_m2: f64,
    pub perimeter_km: f64,
    pub perimeter_m: f64,
    pub elevation_min_m: Option<f64>,
    pub elevation_max_m: Option<f64>,
    pub elevation_mean_m: Option<f64>,
    pub elevation_std_m: Option<f64>,
    pub num_cells: usize,
}

/// A delineated watershed in WGS84.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watershed {
    /// Polygon or MultiPolygon.
    pub geometry: Geometry,
    pub stats: WatershedStats,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// What the result cache stores for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub watershed: Watershed,
    /// Pour point of the request that computed this entry.
    pub pour_point: PourPoint,
    pub computation_seconds: f64,
    pub created_at: DateTime<Utc>,
}

/// Properties of the watershed feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatershedProperties {
    #[serde(flatten)]
    pub stats: WatershedStats,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Properties of the pour point feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PourPointProperties {
    pub snapped: bool,
    pub snap_distance_m: f64,
    pub flow_accumulation: Option<f64>,
    pub original_lat: f64,
    pub original_lon: f64,
}

/// Request bookkeeping returned with every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub processing_time_seconds: f64,
    pub from_cache: bool,
    /// Effective snap radius; `None` when not snapping.
    pub snap_radius: Option<i64>,
    pub cache_key: String,
}

/// A successful delineation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelineationResponse {
    pub watershed: Feature<WatershedProperties>,
    pub pour_point: Feature<PourPointProperties>,
    pub metadata: ResponseMetadata,
}

impl DelineationResponse {
    pub fn new(watershed: &Watershed, pour_point: &PourPoint, metadata: ResponseMetadata) -> Self {
        Self {
            watershed: Feature::new(
                watershed.geometry.clone(),
                WatershedProperties {
                    stats: watershed.stats.clone(),
                    warnings: watershed.warnings.clone(),
                },
            ),
            pour_point: Feature::new(
                Geometry::point(pour_point.lon, pour_point.lat),
                PourPointProperties {
                    snapped: pour_point.snapped,
                    snap_distance_m: pour_point.snap_distance_m,
                    flow_accumulation: pour_point.flow_accumulation,
                    original_lat: pour_point.original_lat,
                    original_lon: pour_point.original_lon,
                },
            ),
            metadata,
        }
    }
}
