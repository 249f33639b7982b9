use crate::domain::model::{SkyMap, SummaryStatistics};
use crate::render::figure::RenderedFigure;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

pub trait Storage {
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()>;
}

/// The recognised run options.
pub trait ConfigProvider {
    fn input_path(&self) -> &Path;
    fn field_index(&self) -> usize;
    fn unit_multiplier(&self) -> f64;
    fn value_bounds(&self) -> (f64, f64);
    fn colormap_name(&self) -> &str;
    fn output_path(&self) -> &Path;
    fn dpi(&self) -> u32;
}

/// The five stages, in execution order.
pub trait Pipeline {
    fn load_map(&self) -> Result<SkyMap>;
    fn convert_units(&self, map: SkyMap) -> SkyMap;
    fn summarize(&self, map: &SkyMap) -> Result<SummaryStatistics>;
    /// Optional machine-readable copy of the statistics.
    fn export_statistics(&self, _stats: &SummaryStatistics) -> Result<()> {
        Ok(())
    }
    fn render(&self, map: &SkyMap) -> Result<RenderedFigure>;
    /// Consumes the figure; it is released whether or not the write succeeds.
    fn write_image(&self, figure: RenderedFigure) -> Result<PathBuf>;
}
