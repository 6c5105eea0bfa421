pub mod aggregate;
pub mod chart;
pub mod etl;
pub mod parser;
pub mod pipeline;

pub use crate::domain::model::{Analysis, AnalysisReport, WarningLog, WarningRecord};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage, DEFAULT_ARCHIVE_NAME};
pub use crate::utils::error::Result;

pub const PER_MINUTE_CSV: &str = "per_minute.csv";
pub const SUMMARY_JSON: &str = "summary.json";
pub const CHART_SVG: &str = "chart.svg";
