pub mod config;
pub mod core;
pub mod domain;
pub mod healpix;
pub mod io;
pub mod render;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use crate::config::{sequence_config::BatchConfig, toml_config::TomlConfig};
pub use crate::core::{
    batch::BatchRunner, engine::VisualizationEngine, pipeline::MollviewPipeline,
    report::StatisticsReporter, transform::UnitConverter,
};
pub use domain::model::{PipelineReport, SkyMap, SummaryStatistics};
pub use io::LocalStorage;
pub use utils::error::{Result, SkyMapError};
