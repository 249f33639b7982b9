use anyhow::Context;
use clap::Parser;
use cmb_skymap::core::batch::JobStatus;
use cmb_skymap::utils::{logger, validation::Validate};
use cmb_skymap::{BatchConfig, BatchRunner, LocalStorage};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "batch-render")]
#[command(about = "Render several HEALPix maps in one process")]
struct Args {
    /// Path to batch configuration file
    #[arg(short, long, default_value = "configs/batch.toml")]
    config: PathBuf,

    /// Root directory for relative output paths
    #[arg(long, default_value = ".")]
    output_root: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Dry run - show the job list without rendering
    #[arg(long)]
    dry_run: bool,

    /// Execution ID for this run
    #[arg(long)]
    execution_id: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("📁 Loading batch configuration from: {}", args.config.display());
    let config = BatchConfig::from_file(&args.config)
        .with_context(|| format!("failed to load batch config '{}'", args.config.display()))?;
    config.validate().context("batch configuration is invalid")?;

    // 生成執行 ID
    let execution_id = args
        .execution_id
        .clone()
        .unwrap_or_else(|| format!("batch_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S")));

    display_batch_summary(&config, &execution_id);
    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No maps will be rendered");
        return Ok(());
    }

    let monitor_enabled = args
        .monitor
        .unwrap_or_else(|| config.defaults.monitoring_enabled());

    let runner = BatchRunner::new(config, execution_id.clone())
        .with_storage(LocalStorage::new(args.output_root.clone()))
        .with_monitoring(monitor_enabled);

    let stdout = std::io::stdout();
    let summary = runner
        .run(&mut stdout.lock())
        .context("failed to write batch output")?;

    eprintln!();
    eprintln!("📊 Batch {} results:", summary.execution_id);
    for outcome in &summary.outcomes {
        match &outcome.status {
            JobStatus::Succeeded(report) => eprintln!(
                "  ✅ {} -> {} ({:.1?})",
                outcome.name,
                report.output_path.display(),
                report.elapsed
            ),
            JobStatus::Failed(e) => eprintln!("  ❌ {}: {}", outcome.name, e.user_friendly_message()),
            JobStatus::Skipped => eprintln!("  ⏸️ {} skipped", outcome.name),
        }
    }

    if summary.failed() > 0 {
        anyhow::bail!("{} of {} jobs failed", summary.failed(), summary.outcomes.len());
    }
    Ok(())
}

fn display_batch_summary(config: &BatchConfig, execution_id: &str) {
    eprintln!("📋 Batch Summary:");
    eprintln!("  Name: {}", config.batch.name);
    if let Some(description) = &config.batch.description {
        eprintln!("  Description: {}", description);
    }
    eprintln!("  Execution ID: {}", execution_id);
    eprintln!("  Continue on error: {}", config.batch.continue_on_error);
    eprintln!();
    eprintln!("📝 Jobs:");
    for (index, job) in config.jobs.iter().enumerate() {
        let status = if job.is_enabled() { "✅" } else { "⏸️" };
        eprintln!(
            "  {}. {} {} -> {}",
            index + 1,
            status,
            job.input.display(),
            job.output.display()
        );
    }
}
