//! Lambert cylindrical equal-area projection on the WGS84 ellipsoid.
//!
//! With a standard parallel of 30° this is EASE-Grid 2.0 Global
//! (EPSG:6933). Every area and perimeter reported for a watershed is
//! measured in this projection, since raw pixel counts in geographic grids
//! shrink with latitude.
//!
//! Formulas follow Snyder, "Map Projections: A Working Manual", §10.

use crate::{WGS84_A, WGS84_INV_F};

/// Cylindrical equal-area projection parameters.
#[derive(Debug, Clone, Copy)]
pub struct CylindricalEqualArea {
    /// Semi-major axis (meters)
    a: f64,
    /// First eccentricity
    e: f64,
    /// Scale factor along the standard parallel
    k0: f64,
    /// Central meridian in radians
    lon0: f64,
    /// q evaluated at the pole
    qp: f64,
}

impl CylindricalEqualArea {
    /// Create a projection for an ellipsoid and standard parallel.
    pub fn new(a: f64, inv_f: f64, standard_parallel_deg: f64, central_meridian_deg: f64) -> Self {
        let f = 1.0 / inv_f;
        let e2 = f * (2.0 - f);
        let e = e2.sqrt();
        let phi_s = standard_parallel_deg.to_radians();
        let k0 = phi_s.cos() / (1.0 - e2 * phi_s.sin().powi(2)).sqrt();

        let mut proj = Self {
            a,
            e,
            k0,
            lon0: central_meridian_deg.to_radians(),
            qp: 0.0,
        };
        proj.qp = proj.q(1.0);
        proj
    }

    /// EASE-Grid 2.0 Global (EPSG:6933).
    pub fn ease_grid_2() -> Self {
        Self::new(WGS84_A, WGS84_INV_F, 30.0, 0.0)
    }

    fn q(&self, sin_phi: f64) -> f64 {
        let e = self.e;
        let es = e * sin_phi;
        (1.0 - e * e) * (sin_phi / (1.0 - es * es) - (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln())
    }

    /// Project lon/lat degrees to meters.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lambda = lon_deg.to_radians() - self.lon0;
        let q = self.q(lat_deg.to_radians().sin());
        let x = self.a * self.k0 * lambda;
        let y = self.a * q / (2.0 * self.k0);
        (x, y)
    }

    /// Unproject meters to lon/lat degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = self.lon0 + x / (self.a * self.k0);
        let q = 2.0 * y * self.k0 / self.a;
        let beta = (q / self.qp).clamp(-1.0, 1.0).asin();

        // Authalic latitude back to geodetic latitude (series expansion)
        let e2 = self.e * self.e;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let phi = beta
            + (e2 / 3.0 + 31.0 * e4 / 180.0 + 517.0 * e6 / 5040.0) * (2.0 * beta).sin()
            + (23.0 * e4 / 360.0 + 251.0 * e6 / 3780.0) * (4.0 * beta).sin()
            + (761.0 * e6 / 45360.0) * (6.0 * beta).sin();

        (lon.to_degrees(), phi.to_degrees())
    }
}

impl Default for CylindricalEqualArea {
    fn default() -> Self {
        Self::ease_grid_2()
    }
}
