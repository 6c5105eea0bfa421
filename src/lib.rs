pub mod config;
pub mod core;
pub mod dashboard;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use core::{etl::AnalysisEngine, pipeline::LogFilePipeline};
pub use utils::error::{AnalyzerError, Result};
