use crate::core::{AnalysisReport, Pipeline};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct AnalysisEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> AnalysisEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// Extract and transform only; nothing is written.
    pub async fn preview(&self) -> Result<AnalysisReport> {
        tracing::info!("📥 Reading warnings log...");
        let log = self.pipeline.extract().await?;
        tracing::info!(
            "Parsed {} records ({} rows dropped)",
            log.records.len(),
            log.dropped_rows
        );
        self.monitor.log_stats("Extract");

        tracing::info!("🔄 Aggregating per minute...");
        let report = self.pipeline.transform(log).await?;
        tracing::info!(
            "{} records in range across {} minutes",
            report.analysis.matched_records,
            report.analysis.per_minute.len()
        );
        self.monitor.log_stats("Transform");

        Ok(report)
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting warnings analysis");

        let report = self.preview().await?;

        tracing::info!("💾 Writing reports...");
        let output_path = self.pipeline.load(report).await?;
        self.monitor.log_stats("Load");
        tracing::debug!("Output saved to: {}", output_path);

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
