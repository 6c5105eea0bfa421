use crate::domain::model::{AnalysisReport, WarningLog};
use crate::utils::error::Result;
use async_trait::async_trait;

pub const DEFAULT_ARCHIVE_NAME: &str = "warnings_report.zip";

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn range_start(&self) -> Option<&str>;
    fn range_end(&self) -> Option<&str>;
    fn delimiter(&self) -> u8;
    fn timestamp_formats(&self) -> &[String];
    fn top_n(&self) -> usize;
    fn zip_output(&self) -> bool;
    fn font_path(&self) -> Option<&str>;
    fn chart_title(&self) -> Option<&str>;

    fn chart_width(&self) -> Option<u32> {
        None
    }

    fn chart_height(&self) -> Option<u32> {
        None
    }

    /// Font families to try before the built-in CJK stack is used.
    fn font_families(&self) -> Option<&[String]> {
        None
    }

    fn archive_name(&self) -> &str {
        DEFAULT_ARCHIVE_NAME
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<WarningLog>;
    async fn transform(&self, log: WarningLog) -> Result<AnalysisReport>;
    async fn load(&self, report: AnalysisReport) -> Result<String>;
}
