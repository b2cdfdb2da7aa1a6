//! Core types for terrain grid access.

use projection::CrsCode;
use serde::{Deserialize, Serialize};

/// The three co-registered rasters of a terrain grid set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridLayer {
    /// Conditioned elevation in meters.
    Elevation,
    /// D8 flow-direction codes.
    FlowDirection,
    /// Flow-accumulation counts.
    FlowAccumulation,
}

impl GridLayer {
    /// All layers, in a stable order.
    pub const ALL: [GridLayer; 3] = [
        GridLayer::Elevation,
        GridLayer::FlowDirection,
        GridLayer::FlowAccumulation,
    ];

    /// Short name used in logs and status reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elevation => "dem",
            Self::FlowDirection => "flow_dir",
            Self::FlowAccumulation => "flow_acc",
        }
    }
}

impl std::fmt::Display for GridLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Affine pixel-to-CRS transform in the GDAL six-coefficient convention:
/// `[x_origin, pixel_width, row_rotation, y_origin, col_rotation, pixel_height]`.
///
/// `pixel_height` is negative for north-up grids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// North-up transform with no rotation.
    pub fn north_up(x_origin: f64, y_origin: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self([x_origin, pixel_width, 0.0, y_origin, 0.0, -pixel_height.abs()])
    }

    /// Map fractional pixel coordinates (col, row) to CRS coordinates.
    ///
    /// Integer coordinates address the top-left corner of a cell; add 0.5
    /// for the cell centre.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let t = &self.0;
        (
            t[0] + col * t[1] + row * t[2],
            t[3] + col * t[4] + row * t[5],
        )
    }

    /// Map CRS coordinates back to fractional pixel coordinates (col, row).
    ///
    /// Returns `None` when the transform is degenerate.
    pub fn invert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let t = &self.0;
        let det = t[1] * t[5] - t[2] * t[4];
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = x - t[0];
        let dy = y - t[3];
        let col = (t[5] * dx - t[2] * dy) / det;
        let row = (-t[4] * dx + t[1] * dy) / det;
        Some((col, row))
    }

    /// Absolute pixel size along x and y in CRS units.
    pub fn pixel_size(&self) -> (f64, f64) {
        let t = &self.0;
        (t[1].hypot(t[4]), t[2].hypot(t[5]))
    }

    /// Compare two transforms with a relative tolerance on each coefficient.
    pub fn approx_eq(&self, other: &GeoTransform) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| {
            let scale = a.abs().max(b.abs()).max(1.0);
            (a - b).abs() <= scale * 1e-9
        })
    }
}

/// A cell address. Row 0 is the northern edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pixel {
    pub col: usize,
    pub row: usize,
}

impl Pixel {
    pub fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }
}

/// Metadata shared by every grid of an aligned set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridMetadata {
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    /// Pixel-to-CRS transform.
    pub transform: GeoTransform,
    /// CRS of the transform's output coordinates.
    pub crs: CrsCode,
    /// Storage chunk dimensions (width, height).
    pub chunk_shape: (usize, usize),
}

impl GridMetadata {
    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Check that a signed pixel address falls inside the grid.
    pub fn contains(&self, col: i64, row: i64) -> bool {
        col >= 0 && row >= 0 && (col as usize) < self.width && (row as usize) < self.height
    }

    /// Window covering the whole grid.
    pub fn full_window(&self) -> PixelWindow {
        PixelWindow::new(0, 0, self.width, self.height)
    }

    /// Check whether another grid's metadata describes the same cells.
    pub fn is_aligned_with(&self, other: &GridMetadata) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.crs == other.crs
            && self.transform.approx_eq(&other.transform)
    }
}

/// Rectangular block of cells in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelWindow {
    pub col: usize,
    pub row: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn new(col: usize, row: usize, width: usize, height: usize) -> Self {
        Self {
            col,
            row,
            width,
            height,
        }
    }

    /// Square window of `radius` cells around a centre, clipped to a grid of
    /// `grid_width` × `grid_height`.
    pub fn around(center: Pixel, radius: usize, grid_width: usize, grid_height: usize) -> Self {
        let col = center.col.saturating_sub(radius);
        let row = center.row.saturating_sub(radius);
        let end_col = (center.col + radius + 1).min(grid_width);
        let end_row = (center.row + radius + 1).min(grid_height);
        Self::new(
            col,
            row,
            end_col.saturating_sub(col),
            end_row.saturating_sub(row),
        )
    }

    /// Clip this window to a grid of the given size.
    pub fn clip(&self, grid_width: usize, grid_height: usize) -> Self {
        let col = self.col.min(grid_width);
        let row = self.row.min(grid_height);
        let end_col = (self.col + self.width).min(grid_width);
        let end_row = (self.row + self.height).min(grid_height);
        Self::new(col, row, end_col - col, end_row - row)
    }

    pub fn end_col(&self) -> usize {
        self.col + self.width
    }

    pub fn end_row(&self) -> usize {
        self.row + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn contains(&self, col: usize, row: usize) -> bool {
        col >= self.col && col < self.end_col() && row >= self.row && row < self.end_row()
    }
}

/// Values read from one layer over a pixel window.
#[derive(Debug, Clone)]
pub struct GridWindow {
    /// Where the values sit in the full grid.
    pub window: PixelWindow,
    /// Row-major values, north to south.
    pub data: Vec<f32>,
    /// Nodata sentinel of the layer (NaN is always treated as nodata).
    pub nodata: Option<f32>,
}

impl GridWindow {
    pub fn new(window: PixelWindow, data: Vec<f32>, nodata: Option<f32>) -> Self {
        Self {
            window,
            data,
            nodata,
        }
    }

    /// Raw value at a full-grid pixel address, including nodata sentinels.
    pub fn raw(&self, col: usize, row: usize) -> Option<f32> {
        if !self.window.contains(col, row) {
            return None;
        }
        let idx = (row - self.window.row) * self.window.width + (col - self.window.col);
        self.data.get(idx).copied()
    }

    /// Valid value at a full-grid pixel address. `None` outside the window or
    /// for nodata cells.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        self.raw(col, row).filter(|v| !is_nodata(*v, self.nodata))
    }

    /// Iterate `(pixel, value)` over every valid cell of the window.
    pub fn valid_cells(&self) -> impl Iterator<Item = (Pixel, f32)> + '_ {
        let w = self.window;
        self.data.iter().enumerate().filter_map(move |(i, &v)| {
            if is_nodata(v, self.nodata) {
                None
            } else {
                Some((Pixel::new(w.col + i % w.width, w.row + i / w.width), v))
            }
        })
    }
}

/// NaN or the layer's declared sentinel.
pub fn is_nodata(value: f32, nodata: Option<f32>) -> bool {
    value.is_nan() || nodata.map_or(false, |nd| value == nd)
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub memory_bytes: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
