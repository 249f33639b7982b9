use approx::assert_relative_eq;
use cmb_skymap::healpix::Ordering;
use cmb_skymap::{SkyMap, SummaryStatistics, UnitConverter};
use proptest::prelude::*;

fn map_from(samples: Vec<f64>) -> SkyMap {
    SkyMap::new(samples, Ordering::Ring).unwrap()
}

proptest! {
    #[test]
    fn conversion_scales_min_max_mean(
        samples in prop::collection::vec(-1e-3f64..1e-3, 12),
        factor in 1.0f64..1e7,
    ) {
        let before = SummaryStatistics::compute(&samples).unwrap();
        let converted = UnitConverter::new(factor).convert(map_from(samples));
        let after = SummaryStatistics::compute(converted.samples()).unwrap();

        prop_assert!((after.min - factor * before.min).abs() <= 1e-9 * factor);
        prop_assert!((after.max - factor * before.max).abs() <= 1e-9 * factor);
        prop_assert!((after.mean - factor * before.mean).abs() <= 1e-9 * factor);
        prop_assert!((after.std_dev - factor * before.std_dev).abs() <= 1e-9 * factor);
    }

    #[test]
    fn statistics_are_ordered(samples in prop::collection::vec(-500.0f64..500.0, 48)) {
        let stats = SummaryStatistics::compute(&samples).unwrap();
        prop_assert!(stats.min <= stats.mean && stats.mean <= stats.max);
        prop_assert!(stats.std_dev >= 0.0);
        prop_assert!(stats.std_dev <= (stats.max - stats.min) / 2.0 + 1e-9);
    }
}

#[test]
fn test_default_converter_is_kelvin_to_microkelvin() {
    let converted = UnitConverter::default().convert(map_from(vec![2.7255; 12]));
    assert_relative_eq!(converted.samples()[5], 2.7255e6, max_relative = 1e-12);
    assert_eq!(converted.unit.as_deref(), Some("μK"));
}
