use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Paths of the written files
    Exported(Vec<String>),
    /// Nothing in the selected date range; not an error
    NoReports,
}

pub struct ReportEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        tracing::info!("🛫 Starting report run...");
        self.monitor.log_stats("Start");

        // Extract
        tracing::info!("📖 Reading reports...");
        let session = self.pipeline.extract().await?;
        self.monitor.log_stats("Extract");

        if session.is_empty() {
            tracing::warn!("No reports found in selected date range.");
            self.monitor.log_final_stats();
            return Ok(RunOutcome::NoReports);
        }
        tracing::info!(
            "✅ Found {} reports between selected dates.",
            session.filtered.len()
        );

        // Transform
        tracing::info!("🌐 Grouping and translating...");
        let result = self.pipeline.transform(session).await?;
        tracing::info!(
            "Translated {} records in {} groups ({} failed, {} edited)",
            result.records.len(),
            result.group_count,
            result.failed_translations,
            result.edited
        );
        self.monitor.log_stats("Transform");

        // Load
        tracing::info!("📥 Exporting...");
        let outputs = self.pipeline.load(result).await?;
        for output in &outputs {
            tracing::info!("📁 Output saved to: {}", output);
        }
        self.monitor.log_final_stats();

        Ok(RunOutcome::Exported(outputs))
    }
}
