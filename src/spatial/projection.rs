//! Lambert Conformal Conic projection between WGS84 longitude/latitude and
//! the NAD83 / New York Long Island state plane: EPSG:32118 in metres and
//! EPSG:2263 in US survey feet. Both use two standard parallels on the
//! GRS80 ellipsoid.
//!
//! NAD83 and WGS84 differ by about a metre in this region, well below the
//! resolution of the area metric and of reprojected points, so no datum
//! shift is applied.

use geo::{Coord, MapCoords};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

const SEMI_MAJOR: f64 = 6_378_137.0;
const INV_FLATTENING: f64 = 298.257_222_101;

/// Metres per US survey foot.
pub const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

/// Lambert Conformal Conic (2SP) parameters.
#[derive(Debug, Clone, Copy)]
pub struct LambertConformal {
    e: f64,
    n: f64,
    af: f64,
    rho0: f64,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
    /// Metres per projected unit.
    unit: f64,
}

impl LambertConformal {
    /// Builds the projection from parallels and origin given in degrees, with
    /// the false origin in metres.
    pub fn new(
        lat1: f64,
        lat2: f64,
        lat0: f64,
        lon0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let f = 1.0 / INV_FLATTENING;
        let e = (2.0 * f - f * f).sqrt();

        let (phi1, phi2, phi0) = (lat1.to_radians(), lat2.to_radians(), lat0.to_radians());
        let (m1, m2) = (m(phi1, e), m(phi2, e));
        let (t1, t2, t0) = (t(phi1, e), t(phi2, e), t(phi0, e));

        let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
        let big_f = m1 / (n * t1.powf(n));
        let af = SEMI_MAJOR * big_f;

        Self {
            e,
            n,
            af,
            rho0: af * t0.powf(n),
            lon0: lon0.to_radians(),
            false_easting,
            false_northing,
            unit: 1.0,
        }
    }

    /// NAD83 / New York Long Island (EPSG:32118).
    pub fn new_york_long_island() -> Self {
        Self::new(
            41.0 + 2.0 / 60.0,
            40.0 + 40.0 / 60.0,
            40.0 + 10.0 / 60.0,
            -74.0,
            300_000.0,
            0.0,
        )
    }

    /// NAD83 / New York Long Island (ftUS), EPSG:2263. Same cone as
    /// EPSG:32118 with coordinates in US survey feet (false easting
    /// 984250 ft).
    pub fn new_york_long_island_ftus() -> Self {
        Self {
            false_easting: 984_250.0 * US_SURVEY_FOOT,
            unit: US_SURVEY_FOOT,
            ..Self::new_york_long_island()
        }
    }

    /// Projects a `(longitude, latitude)` coordinate in degrees.
    pub fn project(&self, c: Coord<f64>) -> Coord<f64> {
        let phi = c.y.to_radians();
        let rho = self.af * t(phi, self.e).powf(self.n);
        let theta = self.n * (c.x.to_radians() - self.lon0);

        Coord {
            x: (self.false_easting + rho * theta.sin()) / self.unit,
            y: (self.false_northing + self.rho0 - rho * theta.cos()) / self.unit,
        }
    }

    /// Inverse of [`project`](Self::project): projected coordinate back to
    /// `(longitude, latitude)` in degrees.
    pub fn unproject(&self, c: Coord<f64>) -> Coord<f64> {
        let dx = c.x * self.unit - self.false_easting;
        let dy = self.rho0 - (c.y * self.unit - self.false_northing);
        let sign = self.n.signum();

        let rho = sign * dx.hypot(dy);
        let theta = (sign * dx).atan2(sign * dy);
        let t = (rho / self.af).powf(1.0 / self.n);

        // latitude has no closed form; converges in a handful of steps
        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..15 {
            let es = self.e * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(self.e / 2.0)).atan();
            let delta = (next - phi).abs();
            phi = next;
            if delta < 1e-12 {
                break;
            }
        }

        Coord {
            x: (theta / self.n + self.lon0).to_degrees(),
            y: phi.to_degrees(),
        }
    }

    /// Projects every coordinate of a geometry.
    pub fn project_geometry<G>(&self, geometry: &G) -> G::Output
    where
        G: MapCoords<f64, f64>,
    {
        geometry.map_coords(|c| self.project(c))
    }

    pub fn unproject_geometry<G>(&self, geometry: &G) -> G::Output
    where
        G: MapCoords<f64, f64>,
    {
        geometry.map_coords(|c| self.unproject(c))
    }
}

fn m(phi: f64, e: f64) -> f64 {
    phi.cos() / (1.0 - (e * phi.sin()).powi(2)).sqrt()
}

fn t(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, polygon};

    #[test]
    fn test_origin_maps_to_false_origin() {
        let proj = LambertConformal::new_york_long_island();
        let p = proj.project(Coord {
            x: -74.0,
            y: 40.0 + 10.0 / 60.0,
        });

        assert!((p.x - 300_000.0).abs() < 1e-6, "{p:?}");
        assert!(p.y.abs() < 1e-6, "{p:?}");
    }

    #[test]
    fn test_scale_is_true_along_standard_parallel() {
        // along a standard parallel an arc of longitude keeps its ellipsoidal length
        let proj = LambertConformal::new_york_long_island();
        let lat: f64 = 41.0 + 2.0 / 60.0;
        let a = proj.project(Coord { x: -74.0, y: lat });
        let b = proj.project(Coord { x: -73.99, y: lat });
        let projected = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();

        let f = 1.0 / INV_FLATTENING;
        let e2 = 2.0 * f - f * f;
        let phi = lat.to_radians();
        let radius = SEMI_MAJOR * phi.cos() / (1.0 - e2 * phi.sin().powi(2)).sqrt();
        let expected = radius * 0.01_f64.to_radians();

        assert!((projected - expected).abs() / expected < 1e-6);
    }

    #[test]
    fn test_projected_area_of_small_cell() {
        // 0.01 x 0.01 degree cell in midtown is roughly 0.94 sq km
        let proj = LambertConformal::new_york_long_island();
        let cell = polygon![
            (x: -73.99, y: 40.75),
            (x: -73.98, y: 40.75),
            (x: -73.98, y: 40.76),
            (x: -73.99, y: 40.76),
            (x: -73.99, y: 40.75),
        ];
        let area_sqkm = proj.project_geometry(&cell).unsigned_area() / 1_000_000.0;

        assert!(area_sqkm > 0.92 && area_sqkm < 0.96, "{area_sqkm}");
    }

    #[test]
    fn test_unproject_inverts_project() {
        let proj = LambertConformal::new_york_long_island();
        for (lon, lat) in [(-74.0, 40.7), (-73.95, 40.78), (-73.7, 40.58), (-74.25, 40.92)] {
            let back = proj.unproject(proj.project(Coord { x: lon, y: lat }));
            assert!((back.x - lon).abs() < 1e-9, "{back:?}");
            assert!((back.y - lat).abs() < 1e-9, "{back:?}");
        }
    }

    #[test]
    fn test_feet_variant_scales_metres() {
        let metres = LambertConformal::new_york_long_island();
        let feet = LambertConformal::new_york_long_island_ftus();
        let c = Coord { x: -73.9857, y: 40.7484 };

        let (in_m, in_ft) = (metres.project(c), feet.project(c));
        assert!((in_ft.x * US_SURVEY_FOOT - in_m.x).abs() < 1e-6, "{in_ft:?} {in_m:?}");
        assert!((in_ft.y * US_SURVEY_FOOT - in_m.y).abs() < 1e-6, "{in_ft:?} {in_m:?}");

        let origin = feet.project(Coord {
            x: -74.0,
            y: 40.0 + 10.0 / 60.0,
        });
        assert!((origin.x - 984_250.0).abs() < 1e-6, "{origin:?}");

        let back = feet.unproject(in_ft);
        assert!((back.x - c.x).abs() < 1e-9 && (back.y - c.y).abs() < 1e-9);
    }
}
