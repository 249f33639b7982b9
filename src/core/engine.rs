use crate::core::report::StatisticsReporter;
use crate::core::Pipeline;
use crate::domain::model::PipelineReport;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use chrono::Utc;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

pub struct VisualizationEngine<P: Pipeline> {
    pipeline: P,
    reporter: StatisticsReporter,
    monitor: SystemMonitor,
    input_label: PathBuf,
}

impl<P: Pipeline> VisualizationEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            reporter: StatisticsReporter::default(),
            monitor: SystemMonitor::new(monitor_enabled),
            input_label: PathBuf::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: StatisticsReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Input path recorded in the report.
    pub fn with_input_label(mut self, input: impl Into<PathBuf>) -> Self {
        self.input_label = input.into();
        self
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Runs the five stages in order. The statistics lines go to `out`;
    /// everything else is logged.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<PipelineReport> {
        let started = Instant::now();
        tracing::info!("🚀 Starting sky map visualization");
        self.monitor.log_stats("Start");

        // 1. 載入
        let map = self.pipeline.load_map()?;
        tracing::debug!("Loaded nside={} ({} pixels, {})", map.nside(), map.npix(), map.ordering());
        self.monitor.log_stats("Load");

        // 2. 單位轉換
        let map = self.pipeline.convert_units(map);

        // 3. 統計
        let statistics = self.pipeline.summarize(&map)?;
        self.reporter.write_to(&statistics, out)?;
        self.pipeline.export_statistics(&statistics)?;

        // 4. 繪圖
        tracing::info!("🎨 Rendering Mollweide projection");
        let figure = self.pipeline.render(&map)?;
        let (image_width, image_height) = (figure.width(), figure.height());
        self.monitor.log_stats("Render");

        // 5. 輸出
        let output_path = self.pipeline.write_image(figure)?;
        self.monitor.log_stats("Write");

        let elapsed = started.elapsed();
        tracing::info!("✅ Visualization finished in {:?}", elapsed);
        self.monitor.log_final_stats();

        Ok(PipelineReport {
            input_path: self.input_label.clone(),
            output_path,
            nside: map.nside(),
            npix: map.npix(),
            statistics,
            image_width,
            image_height,
            elapsed,
            finished_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{SkyMap, SummaryStatistics};
    use crate::healpix::Ordering;
    use crate::render::figure::{RenderOptions, RenderedFigure};
    use crate::utils::error::SkyMapError;
    use image::RgbImage;
    use std::cell::RefCell;

    /// Records the stage order and serves a fixed map.
    struct ScriptedPipeline {
        samples: Vec<f64>,
        calls: RefCell<Vec<&'static str>>,
    }

    impl ScriptedPipeline {
        fn new(samples: Vec<f64>) -> Self {
            Self {
                samples,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Pipeline for ScriptedPipeline {
        fn load_map(&self) -> Result<SkyMap> {
            self.calls.borrow_mut().push("load");
            let nside = crate::healpix::npix2nside(self.samples.len()).unwrap_or(0);
            Ok(SkyMap::from_parts(self.samples.clone(), nside, Ordering::Ring))
        }

        fn convert_units(&self, mut map: SkyMap) -> SkyMap {
            self.calls.borrow_mut().push("convert");
            map.scale_in_place(1e6);
            map
        }

        fn summarize(&self, map: &SkyMap) -> Result<SummaryStatistics> {
            self.calls.borrow_mut().push("summarize");
            SummaryStatistics::compute(map.samples())
        }

        fn render(&self, _map: &SkyMap) -> Result<RenderedFigure> {
            self.calls.borrow_mut().push("render");
            Ok(RenderedFigure::from_image(RgbImage::new(8, 4), 10, RenderOptions::default().title))
        }

        fn write_image(&self, figure: RenderedFigure) -> Result<PathBuf> {
            self.calls.borrow_mut().push("write");
            drop(figure);
            Ok(PathBuf::from("out.png"))
        }
    }

    #[test]
    fn test_stages_run_in_order() {
        let samples: Vec<f64> = (1..=12).map(|v| v as f64 * 1e-6).collect();
        let engine = VisualizationEngine::new(ScriptedPipeline::new(samples)).with_input_label("in.fits");
        let mut out: Vec<u8> = Vec::new();
        let report = engine.run(&mut out).unwrap();

        assert_eq!(
            *engine.pipeline().calls.borrow(),
            vec!["load", "convert", "summarize", "render", "write"]
        );
        assert_eq!(report.nside, 1);
        assert_eq!((report.image_width, report.image_height), (8, 4));
        assert_eq!(report.input_path, PathBuf::from("in.fits"));
        assert!(String::from_utf8(out).unwrap().starts_with("Coldest pixel temperature: 1.000 μK"));
    }

    #[test]
    fn test_empty_map_stops_before_render() {
        let engine = VisualizationEngine::new(ScriptedPipeline::new(Vec::new()));
        let mut out: Vec<u8> = Vec::new();
        let err = engine.run(&mut out).unwrap_err();

        assert!(matches!(err, SkyMapError::InputError { .. }));
        assert!(out.is_empty());
        assert_eq!(*engine.pipeline().calls.borrow(), vec!["load", "convert", "summarize"]);
    }
}
