pub mod batch;
pub mod engine;
pub mod pipeline;
pub mod report;
pub mod transform;

pub use crate::domain::model::{PipelineReport, SkyMap, SummaryStatistics};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
