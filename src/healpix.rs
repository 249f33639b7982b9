//! HEALPix pixel indexing.
//!
//! Resolution bookkeeping and header parsing live here; the angle-to-pixel
//! lookup for RING and NESTED orderings goes through `cdshealpix`. Angles
//! use `z = cos(colatitude) = sin(latitude)` and longitude `phi` in radians.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;
use std::str::FromStr;

/// Sentinel for missing pixels in HEALPix products.
pub const UNSEEN: f64 = -1.6375e30;

/// True for the `UNSEEN` sentinel, including its float32 rounding
/// (-1.63750004e30) as stored in `E` columns. Same relative tolerance as
/// healpy.
pub fn is_unseen(value: f64) -> bool {
    (value - UNSEEN).abs() <= 1e-5 * UNSEEN.abs()
}

/// Pixel ordering scheme, from the `ORDERING` header keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Ordering {
    #[default]
    Ring,
    Nested,
}

impl FromStr for Ordering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RING" => Ok(Ordering::Ring),
            "NESTED" | "NEST" => Ok(Ordering::Nested),
            other => Err(format!("unknown HEALPix ordering '{}'", other)),
        }
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ordering::Ring => write!(f, "RING"),
            Ordering::Nested => write!(f, "NESTED"),
        }
    }
}

pub fn nside2npix(nside: u32) -> usize {
    12 * (nside as usize) * (nside as usize)
}

/// Inverse of [`nside2npix`]; `None` unless `npix == 12 * nside^2`.
pub fn npix2nside(npix: usize) -> Option<u32> {
    if npix == 0 || npix % 12 != 0 {
        return None;
    }
    let nside = ((npix / 12) as f64).sqrt().round() as usize;
    if nside2npix(nside as u32) == npix {
        u32::try_from(nside).ok()
    } else {
        None
    }
}

/// Check that `nside` is usable with `ordering`.
pub fn is_valid_nside(nside: u32, ordering: Ordering) -> bool {
    match ordering {
        Ordering::Ring => nside > 0,
        Ordering::Nested => nside.is_power_of_two(),
    }
}

/// Pixel containing the direction `(z, phi)`.
pub fn ang2pix(nside: u32, ordering: Ordering, z: f64, phi: f64) -> usize {
    lonlat2pix(nside, ordering, phi, z.clamp(-1.0, 1.0).asin())
}

/// Pixel containing the given longitude/latitude in radians.
pub fn lonlat2pix(nside: u32, ordering: Ordering, lon: f64, lat: f64) -> usize {
    let lon = lon.rem_euclid(TAU);
    let lat = lat.clamp(-FRAC_PI_2, FRAC_PI_2);
    let hash = match ordering {
        Ordering::Ring => cdshealpix::ring::hash(nside, lon, lat),
        // NESTED nside is 2^depth
        Ordering::Nested => cdshealpix::nested::hash(nside.trailing_zeros() as u8, lon, lat),
    };
    hash as usize
}
