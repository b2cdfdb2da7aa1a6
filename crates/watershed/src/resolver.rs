//! Pour-point resolution and stream snapping.

use projection::{from_wgs84, haversine_distance, to_wgs84, CrsCode};
use terrain_grid::{GridLayer, GridSource, Pixel};
use tracing::debug;

use crate::error::{DelineationError, Result};
use crate::types::PourPoint;

/// Meters per degree of longitude at the equator.
const METERS_PER_DEG_LON: f64 = 111_320.0;

/// Meters per degree of latitude.
const METERS_PER_DEG_LAT: f64 = 110_574.0;

/// Turns a clicked coordinate into the outlet cell of a watershed.
#[derive(Debug, Clone, Copy)]
pub struct PourPointResolver {
    max_snap_radius_m: f64,
}

impl PourPointResolver {
    pub fn new(max_snap_radius_m: f64) -> Self {
        Self { max_snap_radius_m }
    }

    /// Resolve a WGS84 click to a pour point.
    ///
    /// With `snap`, the outlet moves to the cell of highest flow
    /// accumulation whose centre lies within `radius_m` of the click itself.
    /// Ties go to the cell nearest the clicked cell (in pixels), then the
    /// lower row, then the lower column. The click is kept as is when no
    /// cell centre is close enough, and a zero radius does not snap.
    pub fn resolve(
        &self,
        grid: &dyn GridSource,
        lon: f64,
        lat: f64,
        snap: bool,
        radius_m: f64,
    ) -> Result<PourPoint> {
        if snap && (!radius_m.is_finite() || radius_m < 0.0 || radius_m > self.max_snap_radius_m)
        {
            return Err(DelineationError::invalid_parameter(format!(
                "snap_radius must be within [0, {}] meters",
                self.max_snap_radius_m
            )));
        }

        let clicked = grid.lonlat_to_pixel(lon, lat).ok_or_else(|| {
            DelineationError::out_of_coverage(format!(
                "({}, {}) is outside the terrain grid extent",
                lat, lon
            ))
        })?;

        if !snap || radius_m == 0.0 {
            return self.unsnapped(grid, lon, lat, clicked);
        }

        // One extra ring covers clicks that sit off their cell's centre
        let pixel_radius = (radius_m / pixel_ground_size(grid, lon, lat)).floor();
        let pixel_radius = if pixel_radius.is_finite() && pixel_radius > 0.0 {
            pixel_radius as usize + 1
        } else {
            1
        };

        let window = grid.read_window_around(GridLayer::FlowAccumulation, clicked, pixel_radius)?;

        let mut best: Option<(Pixel, f32, u64, f64)> = None;
        for (cell, acc) in window.valid_cells() {
            let (cell_lon, cell_lat) = grid.pixel_to_lonlat(cell);
            let distance = haversine_distance(lon, lat, cell_lon, cell_lat);
            if distance > radius_m {
                continue;
            }

            let dc = cell.col.abs_diff(clicked.col) as u64;
            let dr = cell.row.abs_diff(clicked.row) as u64;
            let pixel_distance = dc * dc + dr * dr;

            let better = match &best {
                None => true,
                Some((best_cell, best_acc, best_pixel_distance, _)) => {
                    acc > *best_acc
                        || (acc == *best_acc
                            && (pixel_distance, cell.row, cell.col)
                                < (*best_pixel_distance, best_cell.row, best_cell.col))
                }
            };
            if better {
                best = Some((cell, acc, pixel_distance, distance));
            }
        }

        let Some((resolved, acc, _, snap_distance_m)) = best else {
            debug!(
                col = clicked.col,
                row = clicked.row,
                radius_m,
                "No stream cell within snap radius, keeping click"
            );
            return self.unsnapped(grid, lon, lat, clicked);
        };
        self.check_outlet(grid, resolved)?;

        let (snapped_lon, snapped_lat) = grid.pixel_to_lonlat(resolved);
        debug!(
            from_col = clicked.col,
            from_row = clicked.row,
            to_col = resolved.col,
            to_row = resolved.row,
            accumulation = acc,
            distance_m = snap_distance_m,
            "Snapped pour point"
        );

        Ok(PourPoint {
            original_lon: lon,
            original_lat: lat,
            lon: snapped_lon,
            lat: snapped_lat,
            snapped: true,
            snap_distance_m,
            flow_accumulation: Some(acc as f64),
            pixel: resolved,
        })
    }

    fn unsnapped(&self, grid: &dyn GridSource, lon: f64, lat: f64, clicked: Pixel) -> Result<PourPoint> {
        let flow_accumulation = self.check_outlet(grid, clicked)?;
        Ok(PourPoint {
            original_lon: lon,
            original_lat: lat,
            lon,
            lat,
            snapped: false,
            snap_distance_m: 0.0,
            flow_accumulation,
            pixel: clicked,
        })
    }

    /// The outlet cell needs a flow direction; returns its accumulation.
    fn check_outlet(&self, grid: &dyn GridSource, pixel: Pixel) -> Result<Option<f64>> {
        let (col, row) = (pixel.col as i64, pixel.row as i64);
        if grid.value_at(GridLayer::FlowDirection, col, row)?.is_none() {
            return Err(DelineationError::out_of_coverage(format!(
                "no flow direction data at pixel ({}, {})",
                pixel.col, pixel.row
            )));
        }
        Ok(grid
            .value_at(GridLayer::FlowAccumulation, col, row)?
            .map(f64::from))
    }
}

/// Smaller ground dimension of a cell at a point, in meters.
fn pixel_ground_size(grid: &dyn GridSource, lon: f64, lat: f64) -> f64 {
    let meta = grid.metadata();
    let (width, height) = meta.transform.pixel_size();
    match meta.crs {
        CrsCode::Epsg4326 => {
            let x = width * METERS_PER_DEG_LON * lat.to_radians().cos();
            let y = height * METERS_PER_DEG_LAT;
            x.min(y)
        }
        // Projected cells stretch with latitude; measure one step each way
        CrsCode::Epsg3857 | CrsCode::Epsg6933 => {
            let (x, y) = from_wgs84(meta.crs, lon, lat);
            let (east_lon, east_lat) = to_wgs84(meta.crs, x + width, y);
            let (south_lon, south_lat) = to_wgs84(meta.crs, x, y - height);
            haversine_distance(lon, lat, east_lon, east_lat)
                .min(haversine_distance(lon, lat, south_lon, south_lat))
        }
    }
}
