pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::utils::error::{AnalyzerError, Result};
use crate::utils::validation::{self, Validate, LOG_EXTENSIONS};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "warnings-analyzer")]
#[command(about = "Per-minute analysis of headerless warnings logs")]
pub struct CliConfig {
    /// Warnings log (.txt / .csv, no header row)
    #[arg(short, long)]
    pub input: Option<String>,

    /// TOML configuration file; --input, --start, --end, --font and --title override it
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// Range start, e.g. "2024-03-05 14:00"
    #[arg(long)]
    pub start: Option<String>,

    /// Range end (inclusive minute)
    #[arg(long)]
    pub end: Option<String>,

    #[arg(long, value_delimiter = ',', default_value = "csv,json,svg")]
    pub output_formats: Vec<String>,

    /// Bundle all outputs into a single zip archive
    #[arg(long)]
    pub zip: bool,

    /// Font file embedded into the chart
    #[arg(long)]
    pub font: Option<String>,

    #[arg(long)]
    pub title: Option<String>,

    /// Additional chrono timestamp format; repeatable
    #[arg(long = "timestamp-format")]
    pub timestamp_formats: Vec<String>,

    #[arg(long, default_value = ",")]
    pub delimiter: String,

    /// Entries kept per breakdown column
    #[arg(long, default_value = "10")]
    pub top_n: usize,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per stage")]
    pub monitor: bool,

    #[arg(long, help = "Show what would be processed without writing outputs")]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        self.input.as_deref().unwrap_or_default()
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.output_formats
    }

    fn range_start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    fn range_end(&self) -> Option<&str> {
        self.end.as_deref()
    }

    fn delimiter(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }

    fn timestamp_formats(&self) -> &[String] {
        &self.timestamp_formats
    }

    fn top_n(&self) -> usize {
        self.top_n
    }

    fn zip_output(&self) -> bool {
        self.zip
    }

    fn font_path(&self) -> Option<&str> {
        self.font.as_deref()
    }

    fn chart_title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        let input = self
            .input
            .as_deref()
            .ok_or_else(|| AnalyzerError::MissingConfigError {
                field: "input".to_string(),
            })?;
        validation::validate_path("input", input)?;
        validation::validate_file_extension("input", input, LOG_EXTENSIONS)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_output_formats("output_formats", &self.output_formats)?;
        validation::validate_delimiter("delimiter", &self.delimiter)?;

        if let Some(font) = &self.font {
            validation::validate_path("font", font)?;
        }

        Ok(())
    }
}
