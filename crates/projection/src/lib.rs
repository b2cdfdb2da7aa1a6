//! Coordinate reference system transformations.
//!
//! Implements the projections the terrain grids are delivered in from scratch
//! without external dependencies:
//!
//! - Geographic WGS84 (EPSG:4326)
//! - Web Mercator (EPSG:3857)
//! - EASE-Grid 2.0 global cylindrical equal-area (EPSG:6933), also used for
//!   every area and perimeter measurement

pub mod crs;
pub mod equal_area;
pub mod geodesic;
pub mod mercator;
pub mod transform;

pub use crs::{CrsCode, CrsParseError};
pub use equal_area::CylindricalEqualArea;
pub use geodesic::{haversine_distance, ring_length, ring_signed_area, EARTH_MEAN_RADIUS_M};
pub use mercator::WebMercator;
pub use transform::{from_wgs84, to_equal_area, to_wgs84};

/// WGS84 semi-major axis in meters.
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS84 inverse flattening.
pub const WGS84_INV_F: f64 = 298.257_223_563;
