//! Distances and planar ring measurements.

/// Mean Earth radius (IUGG) in meters.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle distance in meters between two lon/lat points (haversine).
pub fn haversine_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Signed planar area of a closed ring (shoelace).
///
/// Positive for counter-clockwise rings in a y-up coordinate system. The
/// ring may or may not repeat its first vertex at the end. Vertices are
/// taken relative to the first one, so projected coordinates in the tens of
/// millions of meters keep their sub-meter precision.
pub fn ring_signed_area(ring: &[(f64, f64)]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let (ox, oy) = ring[0];
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let (x1, y1) = ring[i];
        let (x2, y2) = ring[(i + 1) % ring.len()];
        sum += (x1 - ox) * (y2 - oy) - (x2 - ox) * (y1 - oy);
    }
    sum / 2.0
}

/// Planar length of a closed ring, including the closing edge.
pub fn ring_length(ring: &[(f64, f64)]) -> f64 {
    if ring.len() < 2 {
        return 0.0;
    }
    (0..ring.len())
        .map(|i| {
            let (x1, y1) = ring[i];
            let (x2, y2) = ring[(i + 1) % ring.len()];
            (x2 - x1).hypot(y2 - y1)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_zero() {
        assert_eq!(haversine_distance(-77.0, 38.9, -77.0, 38.9), 0.0);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_distance(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_195.0).abs() < 5.0, "d = {}", d);
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = haversine_distance(-122.0, 37.5, -122.001, 37.5);
        let b = haversine_distance(-122.001, 37.5, -122.0, 37.5);
        assert!((a - b).abs() < 1e-9);
        assert!((a - 88.2).abs() < 0.5, "a = {}", a);
    }

    #[test]
    fn test_ring_area_orientation() {
        let ccw = [(0.0, 0.0), (2.0, 0.0), (2.0, 3.0), (0.0, 3.0)];
        assert!((ring_signed_area(&ccw) - 6.0).abs() < 1e-12);

        let cw: Vec<_> = ccw.iter().rev().copied().collect();
        assert!((ring_signed_area(&cw) + 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_ring_area_far_from_origin() {
        let local = [
            (25.3, 0.0),
            (15.77, 14.0),
            (-5.63, 17.45),
            (-22.8, 7.77),
            (-22.8, -7.77),
            (-5.63, -17.45),
            (15.77, -14.0),
        ];
        let expected = ring_signed_area(&local);

        // EASE-Grid 2 and Web Mercator coordinates reach 1.7e7 m
        for (x0, y0) in [(-7_430_123.456, 4_612_345.678), (17_001_234.5, -6_543_210.9)] {
            let ring: Vec<_> = local.iter().map(|&(x, y)| (x0 + x, y0 + y)).collect();
            let area = ring_signed_area(&ring);
            assert!((area - expected).abs() < 1e-5, "area {} vs {}", area, expected);
        }
    }

    #[test]
    fn test_ring_length() {
        let square = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        assert!((ring_length(&square) - 4.0).abs() < 1e-12);
    }
}
