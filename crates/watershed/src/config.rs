//! Configuration for the delineation engine.

use serde::{Deserialize, Serialize};

use crate::d8::D8Encoding;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelineationConfig {
    /// Snap to the drainage network when the request does not say.
    pub snap_to_stream: bool,

    /// Snap radius in meters when the request does not say.
    pub default_snap_radius: i64,

    /// Largest snap radius a request may ask for, in meters.
    pub max_snap_radius: i64,

    /// Ceiling on the number of cells in one watershed.
    pub max_watershed_cells: usize,

    /// Decimal places of the coordinates in cache keys.
    pub cache_key_precision: usize,

    /// Store and reuse computed watersheds.
    pub cache_enabled: bool,

    /// Flow-direction code scheme of the grids.
    pub d8_encoding: D8Encoding,
}

impl Default for DelineationConfig {
    fn default() -> Self {
        Self {
            snap_to_stream: true,
            default_snap_radius: 100,
            max_snap_radius: 1000,
            max_watershed_cells: 25_000_000,
            cache_key_precision: 6,
            cache_enabled: true,
            d8_encoding: D8Encoding::Esri,
        }
    }
}

impl DelineationConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SNAP_TO_STREAM") {
            config.snap_to_stream = parse_bool(&val);
        }

        if let Ok(val) = std::env::var("DEFAULT_SNAP_RADIUS") {
            if let Ok(radius) = val.parse() {
                config.default_snap_radius = radius;
            }
        }

        if let Ok(val) = std::env::var("MAX_SNAP_RADIUS") {
            if let Ok(radius) = val.parse() {
                config.max_snap_radius = radius;
            }
        }

        if let Ok(val) = std::env::var("MAX_WATERSHED_CELLS") {
            if let Ok(cells) = val.parse() {
                config.max_watershed_cells = cells;
            }
        }

        if let Ok(val) = std::env::var("CACHE_KEY_PRECISION") {
            if let Ok(precision) = val.parse() {
                config.cache_key_precision = precision;
            }
        }

        if let Ok(val) = std::env::var("CACHE_ENABLED") {
            config.cache_enabled = parse_bool(&val);
        }

        if let Ok(val) = std::env::var("D8_ENCODING") {
            if let Some(encoding) = D8Encoding::from_str(&val) {
                config.d8_encoding = encoding;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_snap_radius < 0 {
            return Err("max_snap_radius must be >= 0".to_string());
        }

        if self.default_snap_radius < 0 || self.default_snap_radius > self.max_snap_radius {
            return Err(format!(
                "default_snap_radius must be within [0, {}]",
                self.max_snap_radius
            ));
        }

        if self.max_watershed_cells == 0 {
            return Err("max_watershed_cells must be > 0".to_string());
        }

        if self.cache_key_precision > 12 {
            return Err("cache_key_precision must be <= 12".to_string());
        }

        Ok(())
    }
}

fn parse_bool(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
