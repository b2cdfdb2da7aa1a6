//! Watershed statistics.

use std::collections::BTreeMap;

use terrain_grid::{GridLayer, GridSource, Pixel};
use tracing::{debug, warn};

use crate::error::Result;
use crate::mask::CellMask;
use crate::tiles::LayerTiles;
use crate::types::WatershedStats;

/// Square meters per square mile.
pub const SQ_METERS_PER_SQ_MILE: f64 = 2_589_988.11;

/// Elevation summary over the valid cells of a watershed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub count: usize,
}

/// Sample the elevation grid under a mask.
///
/// Cells are grouped by tile and each tile is read once, then dropped, so
/// a long or diagonal watershed never loads its whole bounding box. Returns
/// `None`, with a warning logged, when no masked cell has valid elevation.
pub fn elevation_stats(
    grid: &dyn GridSource,
    mask: &CellMask,
    tile_size: usize,
) -> Result<Option<ElevationStats>> {
    let tiles = LayerTiles::new(grid, GridLayer::Elevation, tile_size);
    let mut by_tile: BTreeMap<(usize, usize), Vec<Pixel>> = BTreeMap::new();
    for cell in mask.iter() {
        let (tile_col, tile_row) = tiles.key(cell);
        by_tile.entry((tile_row, tile_col)).or_default().push(cell);
    }

    // Welford's running mean and variance
    let mut count = 0usize;
    let mut mean = 0.0f64;
    let mut m2 = 0.0f64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for (&(tile_row, tile_col), cells) in &by_tile {
        let tile = tiles.read((tile_col, tile_row))?;
        for cell in cells {
            let Some(value) = tile.get(cell.col, cell.row) else {
                continue;
            };
            let value = f64::from(value);
            count += 1;
            let delta = value - mean;
            mean += delta / count as f64;
            m2 += delta * (value - mean);
            min = min.min(value);
            max = max.max(value);
        }
    }
    debug!(tiles_read = by_tile.len(), "Elevation sampled");

    if count == 0 {
        warn!(cells = mask.len(), "No valid elevation data within watershed");
        return Ok(None);
    }

    Ok(Some(ElevationStats {
        min,
        max,
        mean,
        std: (m2 / count as f64).sqrt(),
        count,
    }))
}

/// Assemble reported statistics from raw measurements, rounding areas and
/// lengths to the precision clients expect.
pub fn measurements(
    area_m2: f64,
    perimeter_m: f64,
    elevation: Option<&ElevationStats>,
    num_cells: usize,
) -> WatershedStats {
    WatershedStats {
        area_km2: round_to(area_m2 / 1_000_000.0, 4),
        area_mi2: round_to(area_m2 / SQ_METERS_PER_SQ_MILE, 4),
        area_m2: round_to(area_m2, 2),
        perimeter_km: round_to(perimeter_m / 1000.0, 4),
        perimeter_m: round_to(perimeter_m, 2),
        elevation_min_m: elevation.map(|e| e.min),
        elevation_max_m: elevation.map(|e| e.max),
        elevation_mean_m: elevation.map(|e| e.mean),
        elevation_std_m: elevation.map(|e| e.std),
        num_cells,
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
