use crate::domain::ports::ConfigProvider;
use crate::render::colormap::Colormap;
use crate::render::figure::{CoordFrame, RenderOptions};
use crate::utils::error::{Result, SkyMapError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Run configuration. Every section and key is optional; the defaults
/// reproduce the Planck SMICA figure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub input: InputConfig,
    pub transform: TransformConfig,
    pub render: RenderConfig,
    pub output: OutputConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: PathBuf,
    /// Binary-table column; 0 is the temperature (I_STOKES).
    pub field: usize,
    /// Fail instead of warn when the column unit is not kelvin.
    pub require_kelvin: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("smica_cmb_map.fits"),
            field: 0,
            require_kelvin: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub unit_multiplier: f64,
    pub unit_symbol: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            unit_multiplier: 1e6,
            unit_symbol: "μK".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub title: String,
    pub unit_label: String,
    pub colormap: String,
    pub min: f64,
    pub max: f64,
    pub coord: String,
    pub colorbar: bool,
    pub graticule: bool,
    pub graticule_spacing: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let defaults = RenderOptions::default();
        Self {
            title: defaults.title,
            unit_label: defaults.unit_label,
            colormap: defaults.colormap.name().to_string(),
            min: defaults.min,
            max: defaults.max,
            coord: "G".to_string(),
            colorbar: defaults.colorbar,
            graticule: true,
            graticule_spacing: defaults.graticule.unwrap_or(30.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub dpi: u32,
    pub stats_json: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("cmb_temperature_mollweide.png"),
            dpi: 300,
            stats_json: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| SkyMapError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SkyMapError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SkyMapError::ConfigError {
            message: format!("cannot serialise configuration: {}", e),
        })
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        let input = self.input.path.to_string_lossy();
        validation::validate_path("input.path", &input)?;
        validation::validate_file_extension("input.path", &input, &["fits", "fit", "fts"])?;

        let output = self.output.path.to_string_lossy();
        validation::validate_path("output.path", &output)?;
        validation::validate_file_extension("output.path", &output, &["png"])?;
        if let Some(stats) = &self.output.stats_json {
            validation::validate_path("output.stats_json", &stats.to_string_lossy())?;
        }

        validation::validate_range("output.dpi", self.output.dpi, 1, 1200)?;
        validation::validate_finite("transform.unit_multiplier", self.transform.unit_multiplier)?;
        validation::validate_non_empty_string("transform.unit_symbol", &self.transform.unit_symbol)?;
        validation::validate_bounds("render.min/max", self.render.min, self.render.max)?;
        if self.render.graticule {
            validation::validate_range("render.graticule_spacing", self.render.graticule_spacing, 1.0, 90.0)?;
        }

        self.render.colormap.parse::<Colormap>()?;
        self.render.coord.parse::<CoordFrame>()?;
        Ok(())
    }

    pub fn render_options(&self) -> Result<RenderOptions> {
        Ok(RenderOptions {
            title: self.render.title.clone(),
            unit_label: self.render.unit_label.clone(),
            colormap: self.render.colormap.parse()?,
            min: self.render.min,
            max: self.render.max,
            coord_frame: self.render.coord.parse()?,
            colorbar: self.render.colorbar,
            graticule: self.render.graticule.then_some(self.render.graticule_spacing),
            dpi: self.output.dpi,
        })
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

/// 替換環境變數 (例如 ${DATA_DIR})
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| SkyMapError::ConfigError {
        message: format!("invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &Path {
        &self.input.path
    }

    fn field_index(&self) -> usize {
        self.input.field
    }

    fn unit_multiplier(&self) -> f64 {
        self.transform.unit_multiplier
    }

    fn value_bounds(&self) -> (f64, f64) {
        (self.render.min, self.render.max)
    }

    fn colormap_name(&self) -> &str {
        &self.render.colormap
    }

    fn output_path(&self) -> &Path {
        &self.output.path
    }

    fn dpi(&self) -> u32 {
        self.output.dpi
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
