use crate::config::toml_config::{substitute_env_vars, TomlConfig};
use crate::utils::error::{Result, SkyMapError};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Several maps rendered in one process. `defaults` is a full run
/// configuration; each job overrides its input, output and a few labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub batch: BatchInfo,
    #[serde(default)]
    pub defaults: TomlConfig,
    pub jobs: Vec<JobDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInfo {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub continue_on_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,
    pub enabled: Option<bool>,
    pub input: PathBuf,
    pub output: PathBuf,
    pub field: Option<usize>,
    pub title: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub colormap: Option<String>,
    pub stats_json: Option<PathBuf>,
}

impl JobDefinition {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

impl BatchConfig {
    /// 從 TOML 檔案載入批次配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| SkyMapError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SkyMapError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// The run configuration of one job: defaults plus the job's overrides.
    pub fn job_config(&self, job: &JobDefinition) -> TomlConfig {
        let mut config = self.defaults.clone();
        config.input.path = job.input.clone();
        config.output.path = job.output.clone();
        if let Some(field) = job.field {
            config.input.field = field;
        }
        if let Some(title) = &job.title {
            config.render.title = title.clone();
        }
        if let Some(min) = job.min {
            config.render.min = min;
        }
        if let Some(max) = job.max {
            config.render.max = max;
        }
        if let Some(colormap) = &job.colormap {
            config.render.colormap = colormap.clone();
        }
        if job.stats_json.is_some() {
            config.output.stats_json = job.stats_json.clone();
        }
        config
    }

    pub fn get_job(&self, name: &str) -> Option<&JobDefinition> {
        self.jobs.iter().find(|job| job.name == name)
    }

    pub fn enabled_jobs(&self) -> Vec<&JobDefinition> {
        self.jobs.iter().filter(|job| job.is_enabled()).collect()
    }
}

impl Validate for BatchConfig {
    fn validate(&self) -> Result<()> {
        if self.jobs.is_empty() {
            return Err(SkyMapError::ConfigValidationError {
                field: "jobs".to_string(),
                message: "at least one [[jobs]] entry is required".to_string(),
            });
        }

        let mut names = HashSet::new();
        let mut outputs = HashSet::new();
        for job in &self.jobs {
            if !names.insert(job.name.as_str()) {
                return Err(SkyMapError::ConfigValidationError {
                    field: format!("jobs.{}", job.name),
                    message: "duplicate job name".to_string(),
                });
            }
            // 兩個工作寫同一張圖會互相覆蓋
            if job.is_enabled() && !outputs.insert(job.output.as_path()) {
                return Err(SkyMapError::ConfigValidationError {
                    field: format!("jobs.{}.output", job.name),
                    message: format!("{} is written by another job", job.output.display()),
                });
            }

            self.job_config(job).validate().map_err(|e| SkyMapError::ConfigValidationError {
                field: format!("jobs.{}", job.name),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}
