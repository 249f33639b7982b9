use cmb_skymap::core::batch::JobStatus;
use cmb_skymap::healpix::Ordering;
use cmb_skymap::io::write_healpix_map;
use cmb_skymap::utils::validation::Validate;
use cmb_skymap::{BatchConfig, BatchRunner, LocalStorage, SkyMap};
use tempfile::TempDir;

#[test]
fn test_batch_from_file_with_env_substitution() {
    let temp_dir = TempDir::new().unwrap();
    let maps = temp_dir.path().join("maps");
    std::fs::create_dir_all(&maps).unwrap();

    let ring = SkyMap::new((0..12).map(|i| i as f64 * 1e-5).collect(), Ordering::Ring)
        .unwrap()
        .with_unit("K_CMB");
    let nested = SkyMap::new(vec![-2e-5; 192], Ordering::Nested).unwrap().with_unit("K_CMB");
    write_healpix_map(maps.join("ring.fits"), &ring, "I_STOKES").unwrap();
    write_healpix_map(maps.join("nested.fits"), &nested, "I_STOKES").unwrap();

    std::env::set_var("CMB_BATCH_TEST_MAPS", maps.to_str().unwrap());
    let config_path = temp_dir.path().join("batch.toml");
    std::fs::write(
        &config_path,
        r#"
[batch]
name = "fixtures"
description = "two tiny maps"

[defaults.output]
dpi = 12

[[jobs]]
name = "ring"
input = "${CMB_BATCH_TEST_MAPS}/ring.fits"
output = "plots/ring.png"
stats_json = "plots/ring.json"

[[jobs]]
name = "nested"
input = "${CMB_BATCH_TEST_MAPS}/nested.fits"
output = "plots/nested.png"
colormap = "viridis"
"#,
    )
    .unwrap();

    let config = BatchConfig::from_file(&config_path).unwrap();
    config.validate().unwrap();
    std::env::remove_var("CMB_BATCH_TEST_MAPS");

    let runner = BatchRunner::new(config, "it").with_storage(LocalStorage::new(temp_dir.path()));
    let mut out: Vec<u8> = Vec::new();
    let summary = runner.run(&mut out).unwrap();

    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.execution_id, "it");
    for name in ["plots/ring.png", "plots/nested.png", "plots/ring.json"] {
        assert!(temp_dir.path().join(name).exists(), "{} missing", name);
    }

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("== ring ==\nColdest pixel temperature: 0.000 μK\nHottest pixel temperature: 110.000 μK"));
    assert!(text.contains("== nested ==\nColdest pixel temperature: -20.000 μK"));

    match &summary.outcomes[1].status {
        JobStatus::Succeeded(report) => {
            assert_eq!(report.nside, 4);
            assert_eq!(report.image_width, 102);
        }
        other => panic!("unexpected status {:?}", other),
    }
}
