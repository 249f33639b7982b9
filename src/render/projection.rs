//! Mollweide equal-area projection.
//!
//! Plane coordinates are normalised to the unit ellipse: `u` in `[-1, 1]`
//! across, `v` in `[-1, 1]` up. Longitude grows to the left (sky as seen
//! from inside the sphere), longitude 0 at the centre.

use mapproj::pseudocyl::mol::Mol;
use mapproj::{LonLat, ProjXY, Projection};
use std::f64::consts::{FRAC_PI_2, PI, SQRT_2};
use std::sync::OnceLock;

/// `Mol` with the half-axes of its ellipse, measured once.
struct Mollweide {
    proj: Mol,
    half_width: f64,
    half_height: f64,
}

impl Mollweide {
    fn new() -> Self {
        let proj = Mol::new();
        // x is linear in longitude along the equator
        let half_width = proj
            .proj_lonlat(&LonLat::new(FRAC_PI_2, 0.0))
            .map_or(2.0 * SQRT_2, |xy| 2.0 * xy.x().abs());
        let half_height = proj
            .proj_lonlat(&LonLat::new(0.0, FRAC_PI_2))
            .map_or(SQRT_2, |xy| xy.y().abs());
        Self {
            proj,
            half_width,
            half_height,
        }
    }
}

fn mollweide() -> &'static Mollweide {
    static MOLLWEIDE: OnceLock<Mollweide> = OnceLock::new();
    MOLLWEIDE.get_or_init(Mollweide::new)
}

/// Sky position to normalised plane coordinates.
pub fn forward(lon: f64, lat: f64) -> (f64, f64) {
    let m = mollweide();
    let lon = wrap_longitude(lon);
    let lat = lat.clamp(-FRAC_PI_2, FRAC_PI_2);
    match m.proj.proj_lonlat(&LonLat::new(lon.abs(), lat)) {
        Some(xy) => (
            -lon.signum() * xy.x().abs() / m.half_width,
            xy.y() / m.half_height,
        ),
        None => (0.0, lat.signum()),
    }
}

/// Normalised plane coordinates to `(lon, lat)` in radians; `None`
/// outside the ellipse.
pub fn inverse(u: f64, v: f64) -> Option<(f64, f64)> {
    if u * u + v * v > 1.0 {
        return None;
    }
    let m = mollweide();
    let xy = ProjXY::new(u.abs() * m.half_width, v * m.half_height);
    let lonlat = m.proj.unproj_lonlat(&xy)?;
    // |lon| comes back in [0, π]; the sign follows u, mirrored
    let lon = wrap_longitude(lonlat.lon()).abs().min(PI);
    Some((-u.signum() * lon, lonlat.lat()))
}

/// Longitude into `[-π, π]`.
pub fn wrap_longitude(lon: f64) -> f64 {
    let wrapped = (lon + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI && lon > 0.0 {
        PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_centre_and_edges() {
        let (u, v) = forward(0.0, 0.0);
        assert_abs_diff_eq!(u, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
        let (u, v) = forward(PI, 0.0);
        assert_abs_diff_eq!(u, -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-9);
        let (_, v) = forward(0.0, FRAC_PI_2);
        assert_abs_diff_eq!(v, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ellipse_is_two_to_one() {
        let m = mollweide();
        assert_abs_diff_eq!(m.half_width / m.half_height, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_positive_longitude_is_left() {
        let (u, _) = forward(1.0, 0.2);
        assert!(u < 0.0);
        let (u, _) = forward(-1.0, 0.2);
        assert!(u > 0.0);
    }

    #[test]
    fn test_equal_area_parallel() {
        // latitude of the parallel halving the northern hemisphere's area
        let (_, v) = forward(0.0, (0.5_f64).asin());
        let theta = v.asin();
        assert_abs_diff_eq!(2.0 * theta + (2.0 * theta).sin(), PI * 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_inverse_undoes_forward() {
        for lat_deg in (-85..=85).step_by(17) {
            for lon_deg in (-175..=175).step_by(25) {
                let (lon, lat) = ((lon_deg as f64).to_radians(), (lat_deg as f64).to_radians());
                let (u, v) = forward(lon, lat);
                let (lon2, lat2) = inverse(u, v).unwrap();
                assert_abs_diff_eq!(lon, lon2, epsilon = 1e-9);
                assert_abs_diff_eq!(lat, lat2, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_outside_ellipse() {
        assert!(inverse(0.9, 0.9).is_none());
        assert!(inverse(0.0, 1.0).is_some());
    }

    #[test]
    fn test_wrap_longitude() {
        assert_abs_diff_eq!(wrap_longitude(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_longitude(PI), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_longitude(-PI / 4.0), -PI / 4.0, epsilon = 1e-12);
    }
}
