use crate::config::sequence_config::{BatchConfig, JobDefinition};
use crate::core::engine::VisualizationEngine;
use crate::core::pipeline::MollviewPipeline;
use crate::core::report::StatisticsReporter;
use crate::domain::model::PipelineReport;
use crate::io::LocalStorage;
use crate::render::figure::live_figures;
use crate::utils::error::{Result, SkyMapError};
use std::io::Write;
use std::time::Instant;

#[derive(Debug)]
pub enum JobStatus {
    Succeeded(PipelineReport),
    Failed(SkyMapError),
    /// Disabled, or not reached after an earlier failure.
    Skipped,
}

#[derive(Debug)]
pub struct JobOutcome {
    pub name: String,
    pub status: JobStatus,
}

#[derive(Debug)]
pub struct BatchSummary {
    pub execution_id: String,
    pub outcomes: Vec<JobOutcome>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Succeeded(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Skipped))
    }

    fn count(&self, pred: impl Fn(&JobStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// 依序執行批次中的每個工作
pub struct BatchRunner {
    config: BatchConfig,
    storage: LocalStorage,
    execution_id: String,
    monitor_enabled: bool,
}

impl BatchRunner {
    pub fn new(config: BatchConfig, execution_id: impl Into<String>) -> Self {
        Self {
            config,
            storage: LocalStorage::default(),
            execution_id: execution_id.into(),
            monitor_enabled: false,
        }
    }

    /// Root for relative output paths.
    pub fn with_storage(mut self, storage: LocalStorage) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor_enabled = enabled;
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Runs every enabled job; statistics go to `out` under a header line
    /// per job.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<BatchSummary> {
        let started = Instant::now();
        let figures_before = live_figures();
        let mut outcomes = Vec::with_capacity(self.config.jobs.len());
        let mut halted = false;

        tracing::info!(
            "🎬 Batch '{}' ({}): {} jobs",
            self.config.batch.name,
            self.execution_id,
            self.config.jobs.len()
        );

        for job in &self.config.jobs {
            if halted || !job.is_enabled() {
                tracing::info!("⏭️ Skipping job '{}'", job.name);
                outcomes.push(JobOutcome {
                    name: job.name.clone(),
                    status: JobStatus::Skipped,
                });
                continue;
            }

            tracing::info!("📦 Job '{}': {}", job.name, job.input.display());
            writeln!(out, "== {} ==", job.name)?;

            let status = match self.run_job(job, out) {
                Ok(report) => JobStatus::Succeeded(report),
                Err(e) => {
                    tracing::error!(
                        "❌ Job '{}' failed: {} (Category: {:?})",
                        job.name,
                        e,
                        e.category()
                    );
                    if !self.config.batch.continue_on_error {
                        tracing::warn!("⚠️ Stopping batch after failed job '{}'", job.name);
                        halted = true;
                    }
                    JobStatus::Failed(e)
                }
            };
            outcomes.push(JobOutcome {
                name: job.name.clone(),
                status,
            });
        }

        let leaked = live_figures().saturating_sub(figures_before);
        if leaked > 0 {
            tracing::warn!("⚠️ {} figures still alive after batch", leaked);
        }

        let summary = BatchSummary {
            execution_id: self.execution_id.clone(),
            outcomes,
        };
        tracing::info!(
            "🏁 Batch finished in {:?}: {} succeeded, {} failed, {} skipped",
            started.elapsed(),
            summary.succeeded(),
            summary.failed(),
            summary.skipped()
        );
        Ok(summary)
    }

    fn run_job<W: Write>(
        &self,
        job: &JobDefinition,
        out: &mut W,
    ) -> Result<PipelineReport> {
        let config = self.config.job_config(job);
        let reporter = StatisticsReporter::new(config.transform.unit_symbol.clone());
        let monitor = self.monitor_enabled || config.monitoring_enabled();
        let pipeline = MollviewPipeline::from_toml(self.storage.clone(), config)?;

        VisualizationEngine::new_with_monitoring(pipeline, monitor)
            .with_reporter(reporter)
            .with_input_label(job.input.clone())
            .run(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::SkyMap;
    use crate::healpix::Ordering;
    use crate::io::write_healpix_map;
    use tempfile::TempDir;

    fn batch_text(dir: &TempDir, continue_on_error: bool) -> String {
        let good = dir.path().join("good.fits");
        let map = SkyMap::new(vec![1e-4; 12], Ordering::Ring).unwrap();
        write_healpix_map(&good, &map, "TEMPERATURE").unwrap();

        format!(
            r#"
[batch]
name = "test"
continue_on_error = {continue_on_error}

[defaults.render]
graticule = false

[defaults.output]
dpi = 10

[[jobs]]
name = "missing"
input = "{missing}"
output = "missing.png"

[[jobs]]
name = "good"
input = "{good}"
output = "good.png"
"#,
            missing = dir.path().join("missing.fits").display(),
            good = good.display(),
        )
    }

    #[test]
    fn test_continue_after_failure() {
        let dir = TempDir::new().unwrap();
        let config = BatchConfig::from_toml_str(&batch_text(&dir, true)).unwrap();
        let runner = BatchRunner::new(config, "test-1").with_storage(LocalStorage::new(dir.path()));

        let mut out = Vec::new();
        let summary = runner.run(&mut out).unwrap();

        assert_eq!((summary.succeeded(), summary.failed(), summary.skipped()), (1, 1, 0));
        assert!(dir.path().join("good.png").exists());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("== good ==\nColdest pixel temperature: 100.000 μK"));
    }

    #[test]
    fn test_stop_after_failure() {
        let dir = TempDir::new().unwrap();
        let config = BatchConfig::from_toml_str(&batch_text(&dir, false)).unwrap();
        let runner = BatchRunner::new(config, "test-2").with_storage(LocalStorage::new(dir.path()));

        let summary = runner.run(&mut std::io::sink()).unwrap();

        assert_eq!((summary.succeeded(), summary.failed(), summary.skipped()), (0, 1, 1));
        assert!(matches!(
            summary.outcomes[0].status,
            JobStatus::Failed(SkyMapError::FileNotFound { .. })
        ));
        assert!(!dir.path().join("good.png").exists());
    }
}
