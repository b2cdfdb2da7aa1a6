//! Grid source trait and implementations.

mod memory;
pub(crate) mod zarr;

pub use memory::MemoryGridSet;
pub use zarr::{ZarrGridSet, ZarrLayer};

use projection::{from_wgs84, to_wgs84};

use crate::error::Result;
use crate::types::{GridLayer, GridMetadata, GridWindow, Pixel, PixelWindow};

/// Read-only windowed access to an aligned set of terrain grids.
///
/// Every read is bounded by a caller-supplied window so large grids are
/// never fully materialized. Reads outside the grid are clipped; a window
/// with no overlap yields an empty [`GridWindow`], never an error. Errors
/// are reserved for genuine I/O or decoding failures.
///
/// Implementations are synchronous; async callers run them on the
/// blocking pool.
pub trait GridSource: Send + Sync {
    /// Metadata shared by all three layers.
    fn metadata(&self) -> &GridMetadata;

    /// Nodata sentinel of a layer (NaN is always nodata as well).
    fn nodata(&self, layer: GridLayer) -> Option<f32>;

    /// Read one layer over a window, clipped to the grid bounds.
    fn read_window(&self, layer: GridLayer, window: PixelWindow) -> Result<GridWindow>;

    /// Read a square window of `radius` cells around a centre pixel.
    fn read_window_around(
        &self,
        layer: GridLayer,
        center: Pixel,
        radius: usize,
    ) -> Result<GridWindow> {
        let meta = self.metadata();
        self.read_window(
            layer,
            PixelWindow::around(center, radius, meta.width, meta.height),
        )
    }

    /// Valid value of a single cell. `None` outside the grid or for nodata.
    fn value_at(&self, layer: GridLayer, col: i64, row: i64) -> Result<Option<f32>> {
        if !self.metadata().contains(col, row) {
            return Ok(None);
        }
        let (col, row) = (col as usize, row as usize);
        let window = self.read_window(layer, PixelWindow::new(col, row, 1, 1))?;
        Ok(window.get(col, row))
    }

    /// Cell containing a point given in the grid's CRS.
    fn geo_to_pixel(&self, x: f64, y: f64) -> Option<Pixel> {
        let meta = self.metadata();
        let (col, row) = meta.transform.invert(x, y)?;
        if !col.is_finite() || !row.is_finite() {
            return None;
        }
        let (col, row) = (col.floor(), row.floor());
        if col < 0.0 || row < 0.0 || col >= meta.width as f64 || row >= meta.height as f64 {
            return None;
        }
        Some(Pixel::new(col as usize, row as usize))
    }

    /// Centre of a cell in the grid's CRS.
    fn pixel_to_geo(&self, pixel: Pixel) -> (f64, f64) {
        self.metadata()
            .transform
            .apply(pixel.col as f64 + 0.5, pixel.row as f64 + 0.5)
    }

    /// Cell containing a WGS84 coordinate.
    fn lonlat_to_pixel(&self, lon: f64, lat: f64) -> Option<Pixel> {
        let (x, y) = from_wgs84(self.metadata().crs, lon, lat);
        self.geo_to_pixel(x, y)
    }

    /// Centre of a cell as WGS84 lon/lat.
    fn pixel_to_lonlat(&self, pixel: Pixel) -> (f64, f64) {
        let (x, y) = self.pixel_to_geo(pixel);
        to_wgs84(self.metadata().crs, x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoTransform;
    use projection::CrsCode;

    fn grid() -> MemoryGridSet {
        MemoryGridSet::new(
            4,
            3,
            GeoTransform::north_up(-77.0, 39.0, 0.01, 0.01),
            CrsCode::Epsg4326,
        )
        .with_layer(
            GridLayer::Elevation,
            (0..12).map(|v| v as f32).collect(),
            Some(5.0),
        )
        .unwrap()
    }

    #[test]
    fn test_geo_pixel_roundtrip() {
        let g = grid();
        let p = g.lonlat_to_pixel(-76.985, 38.975).unwrap();
        assert_eq!(p, Pixel::new(1, 2));

        let (lon, lat) = g.pixel_to_lonlat(p);
        assert!((lon - -76.985).abs() < 1e-9);
        assert!((lat - 38.975).abs() < 1e-9);
    }

    #[test]
    fn test_geo_to_pixel_outside() {
        let g = grid();
        assert!(g.lonlat_to_pixel(-77.001, 38.99).is_none());
        assert!(g.lonlat_to_pixel(-76.95, 38.99).is_none());
        assert!(g.lonlat_to_pixel(-76.99, 39.001).is_none());
        assert!(g.lonlat_to_pixel(-76.99, 38.965).is_none());
    }

    #[test]
    fn test_value_at() {
        let g = grid();
        assert_eq!(g.value_at(GridLayer::Elevation, 2, 1).unwrap(), Some(6.0));
        assert_eq!(g.value_at(GridLayer::Elevation, 1, 1).unwrap(), None);
        assert_eq!(g.value_at(GridLayer::Elevation, -1, 0).unwrap(), None);
        assert_eq!(g.value_at(GridLayer::Elevation, 4, 0).unwrap(), None);
        assert_eq!(g.value_at(GridLayer::FlowDirection, 0, 0).unwrap(), None);
    }

    #[test]
    fn test_read_window_around_clips() {
        let g = grid();
        let w = g
            .read_window_around(GridLayer::Elevation, Pixel::new(0, 0), 1)
            .unwrap();
        assert_eq!(w.window, PixelWindow::new(0, 0, 2, 2));
        assert_eq!(w.data, vec![0.0, 1.0, 4.0, 5.0]);
    }
}
