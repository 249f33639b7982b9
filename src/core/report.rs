use crate::domain::model::SummaryStatistics;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::io::Write;
use std::path::Path;

/// Prints the four summary lines, 3 decimals each.
#[derive(Debug, Clone)]
pub struct StatisticsReporter {
    unit_symbol: String,
}

impl StatisticsReporter {
    pub fn new(unit_symbol: impl Into<String>) -> Self {
        Self {
            unit_symbol: unit_symbol.into(),
        }
    }

    pub fn write_to<W: Write>(&self, stats: &SummaryStatistics, out: &mut W) -> Result<()> {
        let unit = &self.unit_symbol;
        writeln!(out, "Coldest pixel temperature: {:.3} {}", stats.min, unit)?;
        writeln!(out, "Hottest pixel temperature: {:.3} {}", stats.max, unit)?;
        writeln!(out, "Mean temperature: {:.3} {}", stats.mean, unit)?;
        writeln!(out, "Standard deviation: {:.3} {}", stats.std_dev, unit)?;
        out.flush()?;
        Ok(())
    }

    pub fn render(&self, stats: &SummaryStatistics) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_to(stats, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// 將統計結果以 JSON 寫出
    pub fn write_json<S: Storage>(
        &self,
        stats: &SummaryStatistics,
        storage: &S,
        path: &Path,
    ) -> Result<()> {
        let body = serde_json::json!({
            "unit": self.unit_symbol,
            "min": stats.min,
            "max": stats.max,
            "mean": stats.mean,
            "std_dev": stats.std_dev,
        });
        let bytes = serde_json::to_vec_pretty(&body)?;
        storage.write_file(path, &bytes)?;
        tracing::info!("📝 Statistics written to {}", path.display());
        Ok(())
    }
}

impl Default for StatisticsReporter {
    fn default() -> Self {
        Self::new("μK")
    }
}
