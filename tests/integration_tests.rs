use cmb_skymap::healpix::Ordering;
use cmb_skymap::io::write_healpix_map;
use cmb_skymap::render::writer::dpi_to_ppm;
use cmb_skymap::{
    LocalStorage, MollviewPipeline, SkyMap, SkyMapError, StatisticsReporter, TomlConfig,
    VisualizationEngine,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Twelve pixels of 1..=12 μK stored in kelvin, as an nside 1 RING map.
fn write_ramp_map(dir: &Path) -> PathBuf {
    let path = dir.join("ramp.fits");
    let samples = (1..=12).map(|v| v as f64 * 1e-6).collect();
    let map = SkyMap::new(samples, Ordering::Ring)
        .unwrap()
        .with_unit("K_CMB")
        .with_coord_frame("GALACTIC");
    write_healpix_map(&path, &map, "I_STOKES").unwrap();
    path
}

fn small_config(input: PathBuf, output: &str) -> TomlConfig {
    let mut config = TomlConfig::default();
    config.input.path = input;
    config.output.path = PathBuf::from(output);
    config.output.dpi = 20;
    config
}

fn run_once(dir: &TempDir, config: TomlConfig) -> Result<(String, cmb_skymap::PipelineReport), SkyMapError> {
    let reporter = StatisticsReporter::new(config.transform.unit_symbol.clone());
    let pipeline = MollviewPipeline::from_toml(LocalStorage::new(dir.path()), config)?;
    let engine = VisualizationEngine::new(pipeline).with_reporter(reporter);

    let mut out: Vec<u8> = Vec::new();
    let report = engine.run(&mut out)?;
    Ok((String::from_utf8(out).unwrap(), report))
}

#[test]
fn test_end_to_end_twelve_pixel_map() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_ramp_map(temp_dir.path());

    let (stdout, report) = run_once(&temp_dir, small_config(input, "plots/ramp.png")).unwrap();

    assert_eq!(
        stdout,
        "Coldest pixel temperature: 1.000 μK\n\
         Hottest pixel temperature: 12.000 μK\n\
         Mean temperature: 6.500 μK\n\
         Standard deviation: 3.452 μK\n"
    );
    assert_eq!(report.nside, 1);
    assert_eq!(report.npix, 12);
    assert_eq!(report.output_path, PathBuf::from("plots/ramp.png"));
    assert!(temp_dir.path().join("plots/ramp.png").exists());
}

#[test]
fn test_png_dimensions_and_dpi() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_ramp_map(temp_dir.path());

    let (_, report) = run_once(&temp_dir, small_config(input, "ramp.png")).unwrap();
    assert_eq!((report.image_width, report.image_height), (170, 108));

    let png_path = temp_dir.path().join("ramp.png");
    let decoded = image::open(&png_path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (170, 108));

    let file = std::fs::File::open(&png_path).unwrap();
    let reader = png::Decoder::new(std::io::BufReader::new(file)).read_info().unwrap();
    let dims = reader.info().pixel_dims.unwrap();
    assert_eq!(dims.xppu, dpi_to_ppm(20));
    assert_eq!(dims.yppu, dpi_to_ppm(20));
}

#[test]
fn test_statistics_output_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_ramp_map(temp_dir.path());

    let (first, _) = run_once(&temp_dir, small_config(input.clone(), "a.png")).unwrap();
    let (second, _) = run_once(&temp_dir, small_config(input, "a.png")).unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn test_constant_map_has_zero_std() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flat.fits");
    let map = SkyMap::new(vec![0.25; 48], Ordering::Nested).unwrap();
    write_healpix_map(&path, &map, "I_STOKES").unwrap();

    let (stdout, report) = run_once(&temp_dir, small_config(path, "flat.png")).unwrap();
    assert_eq!(report.statistics.std_dev, 0.0);
    assert_eq!(report.statistics.min, report.statistics.max);
    assert!(stdout.contains("Standard deviation: 0.000 μK"));
    assert!(stdout.contains("Mean temperature: 250000.000 μK"));
}

#[test]
fn test_missing_input_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = small_config(temp_dir.path().join("smica_cmb_map.fits"), "out.png");

    let err = run_once(&temp_dir, config).unwrap_err();
    assert!(matches!(err, SkyMapError::FileNotFound { .. }));
    assert_eq!(err.exit_code(), 1);
    assert!(!temp_dir.path().join("out.png").exists());
}

#[test]
fn test_malformed_input_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.fits");
    std::fs::write(&path, b"this is not a FITS file").unwrap();

    let err = run_once(&temp_dir, small_config(path, "out.png")).unwrap_err();
    assert!(matches!(err, SkyMapError::FormatError { .. }));
}

#[test]
fn test_unwritable_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_ramp_map(temp_dir.path());
    // a plain file where the output directory should be
    std::fs::write(temp_dir.path().join("blocked"), b"").unwrap();

    let (stdout, err) = {
        let config = small_config(input, "blocked/out.png");
        let pipeline = MollviewPipeline::from_toml(LocalStorage::new(temp_dir.path()), config).unwrap();
        let mut out: Vec<u8> = Vec::new();
        let err = VisualizationEngine::new(pipeline).run(&mut out).unwrap_err();
        (String::from_utf8(out).unwrap(), err)
    };

    assert!(matches!(err, SkyMapError::WriteError { .. }));
    // statistics were already printed before the write failed
    assert_eq!(stdout.lines().count(), 4);
}

#[test]
fn test_stats_json_written_alongside_png() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_ramp_map(temp_dir.path());
    let mut config = small_config(input, "ramp.png");
    config.output.stats_json = Some(PathBuf::from("ramp_stats.json"));

    run_once(&temp_dir, config).unwrap();

    let json = std::fs::read_to_string(temp_dir.path().join("ramp_stats.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["min"].as_f64().map(|v| (v - 1.0).abs() < 1e-9), Some(true));
    assert_eq!(value["unit"], "μK");
}
