pub mod sequence_config;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::config::toml_config::TomlConfig;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

/// Command line of `cmb-skymap`. Flags override the config file, which
/// overrides the built-in defaults.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "cmb-skymap")]
#[command(about = "Summarise a HEALPix CMB map and render it as a Mollweide PNG")]
pub struct CliConfig {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// HEALPix FITS map
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Binary table column (0 = temperature)
    #[arg(long)]
    pub field: Option<usize>,

    #[arg(long)]
    pub unit_multiplier: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub min: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub max: Option<f64>,

    /// turbo, viridis or gray
    #[arg(long)]
    pub cmap: Option<String>,

    #[arg(long)]
    pub title: Option<String>,

    /// G, C or E
    #[arg(long)]
    pub coord: Option<String>,

    #[arg(long)]
    pub no_graticule: bool,

    #[arg(long)]
    pub no_colorbar: bool,

    /// PNG output path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub dpi: Option<u32>,

    /// Also write the statistics as JSON
    #[arg(long)]
    pub stats_json: Option<PathBuf>,

    /// Fail when the map unit is not kelvin
    #[arg(long)]
    pub require_kelvin: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per stage")]
    pub monitor: bool,

    /// Show the resolved configuration without running
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 合併設定檔與命令列參數
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(input) = &self.input {
            config.input.path = input.clone();
        }
        if let Some(field) = self.field {
            config.input.field = field;
        }
        if self.require_kelvin {
            config.input.require_kelvin = true;
        }
        if let Some(multiplier) = self.unit_multiplier {
            config.transform.unit_multiplier = multiplier;
        }
        if let Some(min) = self.min {
            config.render.min = min;
        }
        if let Some(max) = self.max {
            config.render.max = max;
        }
        if let Some(cmap) = &self.cmap {
            config.render.colormap = cmap.clone();
        }
        if let Some(title) = &self.title {
            config.render.title = title.clone();
        }
        if let Some(coord) = &self.coord {
            config.render.coord = coord.clone();
        }
        if self.no_graticule {
            config.render.graticule = false;
        }
        if self.no_colorbar {
            config.render.colorbar = false;
        }
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if let Some(dpi) = self.dpi {
            config.output.dpi = dpi;
        }
        if let Some(stats_json) = &self.stats_json {
            config.output.stats_json = Some(stats_json.clone());
        }
        if self.monitor {
            config.monitoring.enabled = true;
        }

        Ok(config)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use crate::domain::ports::ConfigProvider;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    #[test]
    fn test_no_arguments_gives_defaults() {
        let cli = CliConfig::parse_from(["cmb-skymap"]);
        let config = cli.resolve().unwrap();
        assert_eq!(config.input_path(), Path::new("smica_cmb_map.fits"));
        assert_eq!(config.dpi(), 300);
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[render]\nmin = -100.0\nmax = 100.0\ncolormap = \"gray\"\n")
            .unwrap();
        let config_path = file.path().to_string_lossy().into_owned();

        let cli = CliConfig::parse_from([
            "cmb-skymap",
            "--config",
            config_path.as_str(),
            "--min",
            "-250",
            "--dpi",
            "72",
            "--no-graticule",
        ]);
        let config = cli.resolve().unwrap();

        assert_eq!(config.value_bounds(), (-250.0, 100.0));
        assert_eq!(config.colormap_name(), "gray");
        assert_eq!(config.dpi(), 72);
        assert!(!config.render.graticule);
    }

    #[test]
    fn test_missing_config_file() {
        let cli = CliConfig::parse_from(["cmb-skymap", "--config", "/nonexistent/cmb.toml"]);
        assert!(cli.resolve().is_err());
    }
}
