//! Polygon extraction from cell masks.
//!
//! Every side of a mask cell that borders a non-mask cell becomes a
//! directed unit edge, oriented so the mask lies to the right of travel in
//! pixel space (rows growing downwards). Edges are linked into closed rings
//! turning right first wherever two rings meet at a corner, so cells that
//! only touch diagonally end up in separate parts. Outer rings come out with
//! positive pixel-space area and holes with negative area.

use std::collections::BTreeMap;

use projection::{ring_length, ring_signed_area, to_equal_area, to_wgs84};
use terrain_grid::{GridMetadata, GridSource};
use tracing::{debug, error};

use crate::error::{DelineationError, Result};
use crate::geojson::{Geometry, Ring};
use crate::mask::CellMask;
use crate::stats::{elevation_stats, measurements};
use crate::tiles::DEFAULT_TILE_SIZE;
use crate::types::Watershed;

const EAST: u8 = 1;
const SOUTH: u8 = 2;
const WEST: u8 = 4;
const NORTH: u8 = 8;

/// A vertex in pixel-corner coordinates, `(x, y)` = (column, row).
type Vertex = (i64, i64);

fn step(dir: u8) -> (i64, i64) {
    match dir {
        EAST => (1, 0),
        SOUTH => (0, 1),
        WEST => (-1, 0),
        _ => (0, -1),
    }
}

fn turn_right(dir: u8) -> u8 {
    match dir {
        EAST => SOUTH,
        SOUTH => WEST,
        WEST => NORTH,
        _ => EAST,
    }
}

fn turn_left(dir: u8) -> u8 {
    match dir {
        EAST => NORTH,
        NORTH => WEST,
        WEST => SOUTH,
        _ => EAST,
    }
}

/// One polygon in pixel-corner coordinates: an outer ring and its holes.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelPolygon {
    pub outer: Vec<Vertex>,
    pub holes: Vec<Vec<Vertex>>,
}

/// Boundary rings of a mask, open (first vertex not repeated), collinear
/// vertices removed. Coordinates are full-grid pixel corners.
pub fn boundary_rings(mask: &CellMask) -> Result<Vec<Vec<Vertex>>> {
    // Outgoing edge directions per vertex, ordered by (row, col)
    let mut out: BTreeMap<(i64, i64), u8> = BTreeMap::new();
    for cell in mask.iter() {
        let (c, r) = (cell.col as i64, cell.row as i64);
        if !mask.contains_signed(c, r - 1) {
            *out.entry((r, c)).or_default() |= EAST;
        }
        if !mask.contains_signed(c + 1, r) {
            *out.entry((r, c + 1)).or_default() |= SOUTH;
        }
        if !mask.contains_signed(c, r + 1) {
            *out.entry((r + 1, c + 1)).or_default() |= WEST;
        }
        if !mask.contains_signed(c - 1, r) {
            *out.entry((r + 1, c)).or_default() |= NORTH;
        }
    }

    let mut rings = Vec::new();
    while let Some((&start, &bits)) = out.iter().next() {
        let mut heading = bits & bits.wrapping_neg();
        let mut at = start;
        let mut ring = vec![(start.1, start.0)];

        loop {
            take_edge(&mut out, at, heading);
            let (dx, dy) = step(heading);
            at = (at.0 + dy, at.1 + dx);
            if at == start {
                break;
            }
            ring.push((at.1, at.0));

            let available = out.get(&at).copied().unwrap_or(0);
            heading = [turn_right(heading), heading, turn_left(heading)]
                .into_iter()
                .find(|d| available & d != 0)
                .ok_or_else(|| {
                    DelineationError::internal(format!(
                        "open boundary at pixel corner ({}, {})",
                        at.1, at.0
                    ))
                })?;
        }

        rings.push(drop_collinear(ring));
    }

    Ok(rings)
}

fn take_edge(out: &mut BTreeMap<(i64, i64), u8>, at: (i64, i64), dir: u8) {
    if let Some(bits) = out.get_mut(&at) {
        *bits &= !dir;
        if *bits == 0 {
            out.remove(&at);
        }
    }
}

fn drop_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len();
    if n < 3 {
        return ring;
    }
    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let here = ring[i];
            let next = ring[(i + 1) % n];
            let a = (here.0 - prev.0, here.1 - prev.1);
            let b = (next.0 - here.0, next.1 - here.1);
            a.0 * b.1 - a.1 * b.0 != 0
        })
        .map(|i| ring[i])
        .collect()
}

/// Twice the signed area of a ring in pixel space.
fn doubled_area(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x1, y1) = ring[i];
            let (x2, y2) = ring[(i + 1) % n];
            x1 * y2 - x2 * y1
        })
        .sum()
}

/// Centre of the non-mask cell left of a hole ring's first edge.
fn interior_point(ring: &[Vertex]) -> (f64, f64) {
    let (x0, y0) = ring[0];
    let (x1, y1) = ring[1 % ring.len()];
    let (dx, dy) = ((x1 - x0).signum() as f64, (y1 - y0).signum() as f64);
    // Left of travel in a y-down frame
    let (lx, ly) = (dy, -dx);
    (
        x0 as f64 + 0.5 * dx + 0.5 * lx,
        y0 as f64 + 0.5 * dy + 0.5 * ly,
    )
}

fn point_in_ring(point: (f64, f64), ring: &[Vertex]) -> bool {
    let (px, py) = point;
    let n = ring.len();
    let mut inside = false;
    for i in 0..n {
        let (x1, y1) = (ring[i].0 as f64, ring[i].1 as f64);
        let (x2, y2) = (ring[(i + 1) % n].0 as f64, ring[(i + 1) % n].1 as f64);
        if (y1 > py) != (y2 > py) && px < x1 + (py - y1) * (x2 - x1) / (y2 - y1) {
            inside = !inside;
        }
    }
    inside
}

/// Group boundary rings into polygons, attaching each hole to the smallest
/// outer ring containing it.
pub fn assemble_polygons(rings: Vec<Vec<Vertex>>) -> Vec<PixelPolygon> {
    let (outers, holes): (Vec<_>, Vec<_>) = rings
        .into_iter()
        .filter(|r| r.len() >= 4)
        .partition(|r| doubled_area(r) > 0);

    let mut polygons: Vec<PixelPolygon> = outers
        .into_iter()
        .map(|outer| PixelPolygon {
            outer,
            holes: Vec::new(),
        })
        .collect();

    for hole in holes {
        let point = interior_point(&hole);
        let owner = polygons
            .iter()
            .enumerate()
            .filter(|(_, p)| point_in_ring(point, &p.outer))
            .min_by_key(|(_, p)| doubled_area(&p.outer))
            .map(|(i, _)| i);

        match owner {
            Some(i) => polygons[i].holes.push(hole),
            None => error!(vertices = hole.len(), "Hole without enclosing ring dropped"),
        }
    }

    polygons
}

/// Builds watershed geometry and statistics from a cell mask.
#[derive(Debug, Clone, Copy)]
pub struct WatershedPolygonBuilder {
    tile_size: usize,
}

impl WatershedPolygonBuilder {
    pub fn new() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
        }
    }

    /// Edge length of the elevation tiles sampled for statistics.
    pub fn with_tile_size(mut self, tile_size: usize) -> Self {
        self.tile_size = tile_size.max(1);
        self
    }

    /// Polygonize a mask, measure it and sample its elevation.
    pub fn build(&self, mask: &CellMask, grid: &dyn GridSource) -> Result<Watershed> {
        if mask.is_empty() {
            return Err(DelineationError::empty_result("the watershed mask has no cells"));
        }

        let polygons = assemble_polygons(boundary_rings(mask)?);
        if polygons.is_empty() {
            return Err(DelineationError::empty_result(
                "polygonizing the mask produced no rings",
            ));
        }

        let meta = grid.metadata();
        let mut area_m2 = 0.0;
        let mut perimeter_m = 0.0;
        let mut parts = Vec::with_capacity(polygons.len());

        for polygon in &polygons {
            let (outer, outer_area, outer_length) = project_ring(meta, &polygon.outer, true);
            area_m2 += outer_area;
            perimeter_m += outer_length;

            let mut rings = vec![outer];
            for hole in &polygon.holes {
                let (ring, hole_area, hole_length) = project_ring(meta, hole, false);
                area_m2 -= hole_area;
                perimeter_m += hole_length;
                rings.push(ring);
            }
            parts.push(rings);
        }

        let mut warnings = Vec::new();
        let elevation = elevation_stats(grid, mask, self.tile_size)?;
        if elevation.is_none() {
            warnings.push("No valid elevation data within watershed".to_string());
        }

        debug!(
            parts = parts.len(),
            cells = mask.len(),
            area_m2,
            "Watershed polygonized"
        );

        Ok(Watershed {
            geometry: Geometry::from_parts(parts),
            stats: measurements(area_m2, perimeter_m, elevation.as_ref(), mask.len()),
            warnings,
        })
    }
}

impl Default for WatershedPolygonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a pixel ring to a closed WGS84 ring, oriented counter-clockwise for
/// outer rings and clockwise for holes, and measure it in EPSG:6933.
/// Returns the ring, its absolute area in m² and its length in m.
fn project_ring(meta: &GridMetadata, ring: &[Vertex], outer: bool) -> (Ring, f64, f64) {
    let mut lonlat: Vec<(f64, f64)> = ring
        .iter()
        .map(|&(x, y)| {
            let (gx, gy) = meta.transform.apply(x as f64, y as f64);
            to_wgs84(meta.crs, gx, gy)
        })
        .collect();

    let ccw = ring_signed_area(&lonlat) > 0.0;
    if ccw != outer {
        lonlat.reverse();
    }

    let projected: Vec<(f64, f64)> = lonlat
        .iter()
        .map(|&(lon, lat)| to_equal_area(lon, lat))
        .collect();
    let area = ring_signed_area(&projected).abs();
    let length = ring_length(&projected);

    let mut coordinates: Ring = lonlat.iter().map(|&(lon, lat)| [lon, lat]).collect();
    if let Some(&first) = coordinates.first() {
        coordinates.push(first);
    }
    (coordinates, area, length)
}
