//! Conversions between a grid's native CRS and WGS84.

use crate::{CrsCode, CylindricalEqualArea, WebMercator};

/// Convert native CRS coordinates to WGS84 lon/lat degrees.
pub fn to_wgs84(crs: CrsCode, x: f64, y: f64) -> (f64, f64) {
    match crs {
        CrsCode::Epsg4326 => (x, y),
        CrsCode::Epsg3857 => WebMercator::new().inverse(x, y),
        CrsCode::Epsg6933 => CylindricalEqualArea::ease_grid_2().inverse(x, y),
    }
}

/// Convert WGS84 lon/lat degrees to native CRS coordinates.
pub fn from_wgs84(crs: CrsCode, lon: f64, lat: f64) -> (f64, f64) {
    match crs {
        CrsCode::Epsg4326 => (lon, lat),
        CrsCode::Epsg3857 => WebMercator::new().forward(lon, lat),
        CrsCode::Epsg6933 => CylindricalEqualArea::ease_grid_2().forward(lon, lat),
    }
}

/// Project WGS84 lon/lat degrees into EPSG:6933 meters for area and
/// length measurement.
pub fn to_equal_area(lon: f64, lat: f64) -> (f64, f64) {
    CylindricalEqualArea::ease_grid_2().forward(lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring_signed_area;

    #[test]
    fn test_geographic_passthrough() {
        assert_eq!(to_wgs84(CrsCode::Epsg4326, -77.0, 38.9), (-77.0, 38.9));
        assert_eq!(from_wgs84(CrsCode::Epsg4326, -77.0, 38.9), (-77.0, 38.9));
    }

    #[test]
    fn test_roundtrip_all_crs() {
        for crs in [CrsCode::Epsg3857, CrsCode::Epsg6933] {
            let (x, y) = from_wgs84(crs, -105.25, 40.01);
            let (lon, lat) = to_wgs84(crs, x, y);
            assert!((lon - -105.25).abs() < 1e-7, "{}: lon {}", crs, lon);
            assert!((lat - 40.01).abs() < 1e-7, "{}: lat {}", crs, lat);
        }
    }

    #[test]
    fn test_equal_area_box() {
        let ring: Vec<(f64, f64)> = [(-77.05, 38.85), (-77.0, 38.85), (-77.0, 38.9), (-77.05, 38.9)]
            .iter()
            .map(|&(lon, lat)| to_equal_area(lon, lat))
            .collect();
        let area_km2 = ring_signed_area(&ring) / 1.0e6;
        assert!((area_km2 - 24.0839).abs() < 0.001, "area = {}", area_km2);
    }
}
