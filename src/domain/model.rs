use crate::healpix::{self, Ordering};
use crate::utils::error::{Result, SkyMapError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Full-sky map: one sample per HEALPix pixel plus the header metadata
/// the renderer needs to look pixels up.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyMap {
    samples: Vec<f64>,
    nside: u32,
    ordering: Ordering,
    pub coord_frame: Option<String>,
    pub unit: Option<String>,
    pub column_name: Option<String>,
}

impl SkyMap {
    /// Build a map, checking the sample count against the resolution.
    pub fn new(samples: Vec<f64>, ordering: Ordering) -> Result<Self> {
        let nside = healpix::npix2nside(samples.len()).ok_or_else(|| SkyMapError::InputError {
            message: format!(
                "{} samples is not a valid HEALPix pixel count (12 * nside^2)",
                samples.len()
            ),
        })?;
        if !healpix::is_valid_nside(nside, ordering) {
            return Err(SkyMapError::InputError {
                message: format!("nside {} is not a power of two, required for {}", nside, ordering),
            });
        }
        Ok(Self::from_parts(samples, nside, ordering))
    }

    /// Unchecked constructor; statistics still work on arbitrary lengths,
    /// including empty maps.
    pub fn from_parts(samples: Vec<f64>, nside: u32, ordering: Ordering) -> Self {
        Self {
            samples,
            nside,
            ordering,
            coord_frame: None,
            unit: None,
            column_name: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_coord_frame(mut self, frame: impl Into<String>) -> Self {
        self.coord_frame = Some(frame.into());
        self
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn nside(&self) -> u32 {
        self.nside
    }

    pub fn ordering(&self) -> Ordering {
        self.ordering
    }

    pub fn npix(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Multiply every sample by `factor`. The only mutation a map sees.
    pub fn scale_in_place(&mut self, factor: f64) {
        self.samples.iter_mut().for_each(|v| *v *= factor);
    }

    /// Sample at the given longitude/latitude (radians).
    pub fn value_at(&self, lon: f64, lat: f64) -> Option<f64> {
        if self.nside == 0 {
            return None;
        }
        let pix = healpix::lonlat2pix(self.nside, self.ordering, lon, lat);
        self.samples.get(pix).copied()
    }
}

/// Descriptive statistics over every sample of a map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl SummaryStatistics {
    /// Population statistics (divisor `n`). Two passes over the data so the
    /// variance does not suffer from cancellation on offset maps. A NaN
    /// sample makes all four values NaN.
    pub fn compute(samples: &[f64]) -> Result<Self> {
        if samples.is_empty() {
            return Err(SkyMapError::InputError {
                message: "cannot compute statistics of an empty map".to_string(),
            });
        }

        let n = samples.len() as f64;
        let (min, max, sum) = samples.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &v| (nan_min(min, v), nan_max(max, v), sum + v),
        );
        let mean = sum / n;
        let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Ok(Self {
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
        })
    }
}

// f64::min/max skip NaN; these keep it
fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

/// What a finished run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub nside: u32,
    pub npix: usize,
    pub statistics: SummaryStatistics,
    pub image_width: u32,
    pub image_height: u32,
    pub elapsed: Duration,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_checks_pixel_count() {
        assert!(SkyMap::new(vec![0.0; 12], Ordering::Ring).is_ok());
        assert!(SkyMap::new(vec![0.0; 48], Ordering::Nested).is_ok());
        assert!(SkyMap::new(vec![0.0; 10], Ordering::Ring).is_err());
        // nside 3 is fine for RING but not NESTED
        assert!(SkyMap::new(vec![0.0; 108], Ordering::Ring).is_ok());
        assert!(SkyMap::new(vec![0.0; 108], Ordering::Nested).is_err());
    }

    #[test]
    fn test_statistics_of_one_to_twelve() {
        let samples: Vec<f64> = (1..=12).map(|v| v as f64).collect();
        let stats = SummaryStatistics::compute(&samples).unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 12.0);
        assert_relative_eq!(stats.mean, 6.5);
        assert_relative_eq!(stats.std_dev, (143.0f64 / 12.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_constant_map_has_zero_spread() {
        let stats = SummaryStatistics::compute(&[-42.25; 48]).unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.min, stats.max);
        assert_relative_eq!(stats.mean, stats.min);
    }

    #[test]
    fn test_nan_sample_poisons_every_statistic() {
        let stats = SummaryStatistics::compute(&[1.0, f64::NAN, 3.0]).unwrap();
        assert!(stats.min.is_nan());
        assert!(stats.max.is_nan());
        assert!(stats.mean.is_nan());
        assert!(stats.std_dev.is_nan());

        let stats = SummaryStatistics::compute(&[f64::NAN, 2.0]).unwrap();
        assert!(stats.min.is_nan() && stats.max.is_nan());
    }

    #[test]
    fn test_empty_map_is_an_input_error() {
        let err = SummaryStatistics::compute(&[]).unwrap_err();
        assert!(matches!(err, SkyMapError::InputError { .. }));
    }

    #[test]
    fn test_scale_in_place() {
        let mut map = SkyMap::new(vec![1e-6; 12], Ordering::Ring).unwrap();
        map.scale_in_place(1e6);
        assert!(map.samples().iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_value_at_pole() {
        let samples: Vec<f64> = (0..12).map(|v| v as f64).collect();
        let map = SkyMap::new(samples, Ordering::Ring).unwrap();
        assert_eq!(map.value_at(0.0, std::f64::consts::FRAC_PI_2), Some(0.0));
        assert_eq!(map.value_at(0.0, 0.0), Some(4.0));
    }
}
