//! Synthetic drainage terrain.
//!
//! These generators create small grid sets whose drainage is known by
//! construction, so tests can state exactly which cells a watershed holds.
//! Flow accumulation is derived from the directions, counting each cell
//! itself, the way terrain-conditioning tools report it.

use projection::CrsCode;
use terrain_grid::{GeoTransform, GridLayer, MemoryGridSet};

/// Default north-west corner of generated grids (lon, lat).
pub const DEFAULT_ORIGIN: (f64, f64) = (-77.0, 39.0);

/// Default cell size in degrees (roughly 100 m).
pub const DEFAULT_PIXEL_DEG: f64 = 0.001;

/// Flow of one synthetic cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
    /// Outlet or sink (code 0).
    Pit,
    /// Missing flow direction.
    NoData,
}

impl Flow {
    /// `(d_col, d_row)` to the receiving cell.
    pub fn offset(self) -> Option<(i64, i64)> {
        match self {
            Flow::N => Some((0, -1)),
            Flow::NE => Some((1, -1)),
            Flow::E => Some((1, 0)),
            Flow::SE => Some((1, 1)),
            Flow::S => Some((0, 1)),
            Flow::SW => Some((-1, 1)),
            Flow::W => Some((-1, 0)),
            Flow::NW => Some((-1, -1)),
            Flow::Pit | Flow::NoData => None,
        }
    }

    pub fn code(self, scheme: CodeScheme) -> f32 {
        let code = match (scheme, self) {
            (_, Flow::Pit) => 0,
            (_, Flow::NoData) => return f32::NAN,
            (CodeScheme::Esri, Flow::E) => 1,
            (CodeScheme::Esri, Flow::SE) => 2,
            (CodeScheme::Esri, Flow::S) => 4,
            (CodeScheme::Esri, Flow::SW) => 8,
            (CodeScheme::Esri, Flow::W) => 16,
            (CodeScheme::Esri, Flow::NW) => 32,
            (CodeScheme::Esri, Flow::N) => 64,
            (CodeScheme::Esri, Flow::NE) => 128,
            (CodeScheme::Whitebox, Flow::NE) => 1,
            (CodeScheme::Whitebox, Flow::E) => 2,
            (CodeScheme::Whitebox, Flow::SE) => 4,
            (CodeScheme::Whitebox, Flow::S) => 8,
            (CodeScheme::Whitebox, Flow::SW) => 16,
            (CodeScheme::Whitebox, Flow::W) => 32,
            (CodeScheme::Whitebox, Flow::NW) => 64,
            (CodeScheme::Whitebox, Flow::N) => 128,
        };
        code as f32
    }
}

/// D8 code scheme written into the flow-direction layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeScheme {
    #[default]
    Esri,
    Whitebox,
}

/// Builder for a synthetic grid set.
#[derive(Debug, Clone)]
pub struct SyntheticTerrain {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: CrsCode,
    pub scheme: CodeScheme,
    flows: Vec<Flow>,
    elevation: Vec<f32>,
}

impl SyntheticTerrain {
    /// All pits, elevation falling towards the south, at the default origin.
    pub fn new(width: usize, height: usize) -> Self {
        let elevation = (0..height)
            .flat_map(|row| (0..width).map(move |_| ((height - row) * 10) as f32))
            .collect();
        Self {
            width,
            height,
            transform: GeoTransform::north_up(
                DEFAULT_ORIGIN.0,
                DEFAULT_ORIGIN.1,
                DEFAULT_PIXEL_DEG,
                DEFAULT_PIXEL_DEG,
            ),
            crs: CrsCode::Epsg4326,
            scheme: CodeScheme::Esri,
            flows: vec![Flow::Pit; width * height],
            elevation,
        }
    }

    pub fn with_transform(mut self, transform: GeoTransform, crs: CrsCode) -> Self {
        self.transform = transform;
        self.crs = crs;
        self
    }

    pub fn with_scheme(mut self, scheme: CodeScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Set every cell to the same flow.
    pub fn fill(mut self, flow: Flow) -> Self {
        self.flows.iter_mut().for_each(|f| *f = flow);
        self
    }

    pub fn with_flow(mut self, col: usize, row: usize, flow: Flow) -> Self {
        self.set_flow(col, row, flow);
        self
    }

    pub fn set_flow(&mut self, col: usize, row: usize, flow: Flow) {
        self.flows[row * self.width + col] = flow;
    }

    pub fn flow_at(&self, col: usize, row: usize) -> Flow {
        self.flows[row * self.width + col]
    }

    /// Replace the elevation surface.
    pub fn with_elevation(mut self, f: impl Fn(usize, usize) -> f32) -> Self {
        for row in 0..self.height {
            for col in 0..self.width {
                self.elevation[row * self.width + col] = f(col, row);
            }
        }
        self
    }

    /// Number of cells draining through each cell, itself included.
    /// `NaN` where the flow direction is missing.
    pub fn accumulation(&self) -> Vec<f32> {
        let mut acc = vec![0.0f32; self.width * self.height];
        let max_steps = self.width * self.height;

        for row in 0..self.height {
            for col in 0..self.width {
                if self.flow_at(col, row) == Flow::NoData {
                    continue;
                }
                let (mut c, mut r) = (col as i64, row as i64);
                for _ in 0..max_steps {
                    acc[r as usize * self.width + c as usize] += 1.0;
                    let Some((dc, dr)) = self.flow_at(c as usize, r as usize).offset() else {
                        break;
                    };
                    let (nc, nr) = (c + dc, r + dr);
                    if nc < 0 || nr < 0 || nc >= self.width as i64 || nr >= self.height as i64 {
                        break;
                    }
                    if self.flow_at(nc as usize, nr as usize) == Flow::NoData {
                        break;
                    }
                    (c, r) = (nc, nr);
                }
            }
        }

        for (i, flow) in self.flows.iter().enumerate() {
            if *flow == Flow::NoData {
                acc[i] = f32::NAN;
            }
        }
        acc
    }

    /// Accumulation value of one cell.
    pub fn accumulation_at(&self, col: usize, row: usize) -> f32 {
        self.accumulation()[row * self.width + col]
    }

    /// Centre of a cell in WGS84 (lon, lat).
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        let (x, y) = self.transform.apply(col as f64 + 0.5, row as f64 + 0.5);
        projection::to_wgs84(self.crs, x, y)
    }

    /// Assemble the three layers.
    pub fn build(&self) -> MemoryGridSet {
        let codes = self.flows.iter().map(|f| f.code(self.scheme)).collect();
        MemoryGridSet::new(self.width, self.height, self.transform, self.crs)
            .with_layer(GridLayer::Elevation, self.elevation.clone(), Some(-9999.0))
            .and_then(|g| g.with_layer(GridLayer::FlowDirection, codes, None))
            .and_then(|g| g.with_layer(GridLayer::FlowAccumulation, self.accumulation(), None))
            .expect("synthetic layers match the grid size")
    }
}

/// Every cell flows south; the bottom row are outlets.
pub fn south_flowing(size: usize) -> SyntheticTerrain {
    let mut terrain = SyntheticTerrain::new(size, size).fill(Flow::S);
    for col in 0..size {
        terrain.set_flow(col, size - 1, Flow::Pit);
    }
    terrain
}

/// [`south_flowing`] plus two diagonal feeders into the bottom-centre
/// outlet: the columns either side of the centre turn towards it one row
/// above the bottom.
///
/// Tracing from the bottom-centre cell yields `size + 2 * (size - 1)` cells.
pub fn south_flowing_with_feeders(size: usize) -> SyntheticTerrain {
    let mid = size / 2;
    south_flowing(size)
        .with_flow(mid - 1, size - 2, Flow::SE)
        .with_flow(mid + 1, size - 2, Flow::SW)
}

/// A valley draining to the bottom-centre cell: the side slopes flow
/// towards the centre column, which flows south.
pub fn converging_valley(width: usize, height: usize) -> SyntheticTerrain {
    let mid = width / 2;
    let mut terrain = SyntheticTerrain::new(width, height);
    for row in 0..height {
        for col in 0..width {
            let flow = match col.cmp(&mid) {
                std::cmp::Ordering::Less => Flow::E,
                std::cmp::Ordering::Greater => Flow::W,
                std::cmp::Ordering::Equal => Flow::S,
            };
            terrain.set_flow(col, row, flow);
        }
    }
    terrain.set_flow(mid, height - 1, Flow::Pit);
    terrain.with_elevation(move |col, row| {
        (height - row) as f32 * 5.0 + (col as i64 - mid as i64).unsigned_abs() as f32 * 2.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrain_grid::GridSource;

    #[test]
    fn test_south_flowing_accumulation() {
        let terrain = south_flowing(5);
        assert_eq!(terrain.accumulation_at(2, 0), 1.0);
        assert_eq!(terrain.accumulation_at(2, 4), 5.0);
    }

    #[test]
    fn test_feeders_accumulation() {
        let terrain = south_flowing_with_feeders(5);
        assert_eq!(terrain.accumulation_at(1, 3), 4.0);
        assert_eq!(terrain.accumulation_at(2, 4), 13.0);
        assert_eq!(terrain.accumulation_at(1, 4), 1.0);
    }

    #[test]
    fn test_converging_valley_drains_everything() {
        let terrain = converging_valley(7, 6);
        assert_eq!(terrain.accumulation_at(3, 5), 42.0);
    }

    #[test]
    fn test_codes_per_scheme() {
        assert_eq!(Flow::S.code(CodeScheme::Esri), 4.0);
        assert_eq!(Flow::S.code(CodeScheme::Whitebox), 8.0);
        assert_eq!(Flow::Pit.code(CodeScheme::Whitebox), 0.0);
        assert!(Flow::NoData.code(CodeScheme::Esri).is_nan());
    }

    #[test]
    fn test_build_matches_shape() {
        let grids = south_flowing(5).build();
        assert_eq!(grids.metadata().width, 5);
        assert_eq!(
            grids.value_at(GridLayer::FlowDirection, 2, 2).unwrap(),
            Some(4.0)
        );
    }

    #[test]
    fn test_nodata_breaks_accumulation() {
        let terrain = south_flowing(3).with_flow(1, 1, Flow::NoData);
        assert!(terrain.accumulation_at(1, 1).is_nan());
        assert_eq!(terrain.accumulation_at(1, 2), 1.0);
        assert_eq!(terrain.accumulation_at(1, 0), 1.0);
    }
}
