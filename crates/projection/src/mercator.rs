//! Spherical Web Mercator (EPSG:3857).

use std::f64::consts::PI;

use crate::WGS84_A;

/// Latitude limit of the square Web Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Web Mercator projection on the WGS84 semi-major axis sphere.
#[derive(Debug, Clone, Copy)]
pub struct WebMercator {
    radius: f64,
}

impl WebMercator {
    pub const fn new() -> Self {
        Self { radius: WGS84_A }
    }

    /// Project lon/lat degrees to meters. Latitude is clamped to the
    /// projection's valid range.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = self.radius * lon_deg.to_radians();
        let y = self.radius * (PI / 4.0 + lat / 2.0).tan().ln();
        (x, y)
    }

    /// Unproject meters to lon/lat degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = (x / self.radius).to_degrees();
        let lat = (2.0 * (y / self.radius).exp().atan() - PI / 2.0).to_degrees();
        (lon, lat)
    }
}

impl Default for WebMercator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_point() {
        let proj = WebMercator::new();
        let (x, y) = proj.forward(-122.0, 37.5);
        assert!((x - -13_580_977.88).abs() < 1.0, "x = {}", x);
        assert!((y - 4_509_031.39).abs() < 5.0, "y = {}", y);
    }

    #[test]
    fn test_roundtrip() {
        let proj = WebMercator::new();
        let (x, y) = proj.forward(12.345, -45.678);
        let (lon, lat) = proj.inverse(x, y);
        assert!((lon - 12.345).abs() < 1e-9);
        assert!((lat - -45.678).abs() < 1e-9);
    }
}
