use clap::Parser;
use cmb_skymap::utils::error::SkyMapError;
use cmb_skymap::utils::{logger, validation::Validate};
use cmb_skymap::{CliConfig, LocalStorage, MollviewPipeline, StatisticsReporter, VisualizationEngine};

fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting cmb-skymap");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    if let Err(e) = run(&cli) {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ Visualization failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );

        // 輸出用戶友好的錯誤信息
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn run(cli: &CliConfig) -> Result<(), SkyMapError> {
    let config = cli.resolve()?;

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        return Err(e);
    }

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be read or written");
        println!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let input = config.input.path.clone();
    let reporter = StatisticsReporter::new(config.transform.unit_symbol.clone());
    let pipeline = MollviewPipeline::from_toml(LocalStorage::default(), config)?;
    let engine = VisualizationEngine::new_with_monitoring(pipeline, monitor_enabled)
        .with_reporter(reporter)
        .with_input_label(input);

    let stdout = std::io::stdout();
    let report = engine.run(&mut stdout.lock())?;

    tracing::info!(
        "📁 Output saved to: {} ({}x{} px, nside {})",
        report.output_path.display(),
        report.image_width,
        report.image_height,
        report.nside
    );
    if report.statistics.std_dev == 0.0 {
        tracing::warn!("⚠️ Map is constant; the figure shows a single colour");
    }
    Ok(())
}
