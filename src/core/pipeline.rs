use crate::core::report::StatisticsReporter;
use crate::core::transform::UnitConverter;
use crate::config::toml_config::TomlConfig;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{SkyMap, SummaryStatistics};
use crate::io::fits;
use crate::render::figure::{ProjectionRenderer, RenderOptions, RenderedFigure};
use crate::render::writer::ImageWriter;
use crate::utils::error::{Result, SkyMapError};
use std::path::PathBuf;

/// FITS map in, Mollweide PNG out.
pub struct MollviewPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    converter: UnitConverter,
    renderer: ProjectionRenderer,
    require_kelvin: bool,
    stats_json: Option<PathBuf>,
}

impl<S: Storage, C: ConfigProvider> MollviewPipeline<S, C> {
    /// Builds the stages from the recognised options; everything else
    /// keeps its default.
    pub fn new(storage: S, config: C) -> Result<Self> {
        let (min, max) = config.value_bounds();
        let options = RenderOptions {
            colormap: config.colormap_name().parse()?,
            min,
            max,
            dpi: config.dpi(),
            ..RenderOptions::default()
        };
        let converter = UnitConverter::new(config.unit_multiplier()).with_unit_symbol("μK");

        Ok(Self {
            storage,
            config,
            converter,
            renderer: ProjectionRenderer::new(options),
            require_kelvin: false,
            stats_json: None,
        })
    }

    /// Replace the render options. Bounds, colormap and DPI in `options`
    /// take precedence over the config provider.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.renderer = ProjectionRenderer::new(options);
        self
    }

    pub fn with_unit_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.converter = self.converter.with_unit_symbol(symbol);
        self
    }

    pub fn with_require_kelvin(mut self, require: bool) -> Self {
        self.require_kelvin = require;
        self
    }

    pub fn with_stats_json(mut self, path: Option<PathBuf>) -> Self {
        self.stats_json = path;
        self
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn renderer(&self) -> &ProjectionRenderer {
        &self.renderer
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn stats_json(&self) -> Option<&PathBuf> {
        self.stats_json.as_ref()
    }

    // 只有 K -> μK 時才檢查欄位單位
    fn check_unit(&self, map: &SkyMap) -> Result<()> {
        let converts_kelvin = (self.converter.multiplier() - 1e6).abs() < 1e-6;
        let Some(unit) = map.unit.as_deref() else {
            return Ok(());
        };
        if !converts_kelvin || looks_like_kelvin(unit) {
            return Ok(());
        }

        let message = format!(
            "column unit '{}' is not kelvin but is being scaled by {}",
            unit,
            self.converter.multiplier()
        );
        if self.require_kelvin {
            return Err(SkyMapError::format(self.config.input_path(), message));
        }
        tracing::warn!("⚠️ {}", message);
        Ok(())
    }

    fn check_frame(&self, map: &SkyMap) {
        let frame = self.renderer.options().coord_frame;
        if let Some(coordsys) = map.coord_frame.as_deref() {
            if !frame.matches_header(coordsys) {
                tracing::warn!(
                    "⚠️ Map COORDSYS is '{}' but the figure is labelled {}; no rotation is applied",
                    coordsys,
                    frame.label()
                );
            }
        }
    }
}

impl<S: Storage> MollviewPipeline<S, TomlConfig> {
    /// Every option from a full configuration file.
    pub fn from_toml(storage: S, config: TomlConfig) -> Result<Self> {
        let options = config.render_options()?;
        let unit_symbol = config.transform.unit_symbol.clone();
        let require_kelvin = config.input.require_kelvin;
        let stats_json = config.output.stats_json.clone();

        Ok(Self::new(storage, config)?
            .with_render_options(options)
            .with_unit_symbol(unit_symbol)
            .with_require_kelvin(require_kelvin)
            .with_stats_json(stats_json))
    }
}

/// `K`, `K_CMB`, `Kcmb`, `K_RJ` and friends.
fn looks_like_kelvin(unit: &str) -> bool {
    let unit = unit.trim().to_ascii_uppercase();
    unit == "K" || (unit.starts_with('K') && !unit.starts_with("KJY") && !unit.starts_with("KM"))
}

impl<S: Storage, C: ConfigProvider> Pipeline for MollviewPipeline<S, C> {
    fn load_map(&self) -> Result<SkyMap> {
        let map = fits::read_healpix_map(self.config.input_path(), self.config.field_index())?;
        self.check_unit(&map)?;
        self.check_frame(&map);
        Ok(map)
    }

    fn convert_units(&self, map: SkyMap) -> SkyMap {
        self.converter.convert(map)
    }

    fn summarize(&self, map: &SkyMap) -> Result<SummaryStatistics> {
        SummaryStatistics::compute(map.samples())
    }

    fn export_statistics(&self, stats: &SummaryStatistics) -> Result<()> {
        match &self.stats_json {
            Some(path) => StatisticsReporter::new(self.converter.unit_symbol().unwrap_or("μK"))
                .write_json(stats, &self.storage, path),
            None => Ok(()),
        }
    }

    fn render(&self, map: &SkyMap) -> Result<RenderedFigure> {
        self.renderer.render(map)
    }

    fn write_image(&self, figure: RenderedFigure) -> Result<PathBuf> {
        ImageWriter::new(&self.storage).write(figure, self.config.output_path())
    }
}
