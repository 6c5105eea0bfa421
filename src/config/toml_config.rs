use crate::core::{ConfigProvider, DEFAULT_ARCHIVE_NAME};
use crate::utils::error::{AnalyzerError, Result};
use crate::utils::validation::{self, Validate, LOG_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8501;
pub const DEFAULT_MAX_UPLOAD_MB: usize = 200;
pub const MAX_UPLOAD_MB_LIMIT: usize = 4096;
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub analysis: Option<AnalysisConfig>,
    pub chart: Option<ChartConfig>,
    pub dashboard: Option<DashboardConfig>,
    pub load: Option<LoadConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub input_path: Option<String>,
    pub delimiter: Option<String>,
    pub timestamp_formats: Option<Vec<String>>,
    pub top_n: Option<usize>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub title: Option<String>,
    pub font_families: Option<Vec<String>>,
    pub font_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub max_upload_mb: Option<usize>,
    pub log_format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${WARNINGS_DIR})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AnalyzerError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    fn analysis(&self) -> Option<&AnalysisConfig> {
        self.analysis.as_ref()
    }

    pub fn bind(&self) -> &str {
        self.dashboard
            .as_ref()
            .and_then(|d| d.bind.as_deref())
            .unwrap_or(DEFAULT_BIND)
    }

    pub fn port(&self) -> u16 {
        self.dashboard
            .as_ref()
            .and_then(|d| d.port)
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.dashboard
            .as_ref()
            .and_then(|d| d.max_upload_mb)
            .unwrap_or(DEFAULT_MAX_UPLOAD_MB)
            .saturating_mul(1024 * 1024)
    }

    pub fn json_logs(&self) -> bool {
        self.dashboard
            .as_ref()
            .and_then(|d| d.log_format.as_deref())
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(analysis) = self.analysis() {
            if let Some(input) = &analysis.input_path {
                validation::validate_path("analysis.input_path", input)?;
                validation::validate_file_extension("analysis.input_path", input, LOG_EXTENSIONS)?;
            }
            if let Some(delimiter) = &analysis.delimiter {
                validation::validate_delimiter("analysis.delimiter", delimiter)?;
            }
            for format in analysis.timestamp_formats.iter().flatten() {
                validation::validate_non_empty_string("analysis.timestamp_formats", format)?;
            }
        }

        if let Some(chart) = &self.chart {
            if let Some(width) = chart.width {
                validation::validate_range("chart.width", width, 200, 8000)?;
            }
            if let Some(height) = chart.height {
                validation::validate_range("chart.height", height, 150, 8000)?;
            }
        }

        if let Some(dashboard) = &self.dashboard {
            if let Some(bind) = &dashboard.bind {
                validation::validate_non_empty_string("dashboard.bind", bind)?;
            }
            if let Some(port) = dashboard.port {
                validation::validate_range("dashboard.port", port, 1, u16::MAX)?;
            }
            if let Some(max_upload) = dashboard.max_upload_mb {
                validation::validate_range(
                    "dashboard.max_upload_mb",
                    max_upload,
                    1,
                    MAX_UPLOAD_MB_LIMIT,
                )?;
            }
        }

        if let Some(load) = &self.load {
            validation::validate_path("load.output_path", &load.output_path)?;
            validation::validate_output_formats("load.output_formats", &load.output_formats)?;
        }

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        self.analysis()
            .and_then(|a| a.input_path.as_deref())
            .unwrap_or_default()
    }

    fn output_path(&self) -> &str {
        self.load
            .as_ref()
            .map(|l| l.output_path.as_str())
            .unwrap_or("./output")
    }

    fn output_formats(&self) -> &[String] {
        self.load
            .as_ref()
            .map(|l| l.output_formats.as_slice())
            .unwrap_or(&[])
    }

    fn range_start(&self) -> Option<&str> {
        self.analysis().and_then(|a| a.start.as_deref())
    }

    fn range_end(&self) -> Option<&str> {
        self.analysis().and_then(|a| a.end.as_deref())
    }

    fn delimiter(&self) -> u8 {
        self.analysis()
            .and_then(|a| a.delimiter.as_deref())
            .and_then(|d| d.as_bytes().first().copied())
            .unwrap_or(b',')
    }

    fn timestamp_formats(&self) -> &[String] {
        self.analysis()
            .and_then(|a| a.timestamp_formats.as_deref())
            .unwrap_or(&[])
    }

    fn top_n(&self) -> usize {
        self.analysis()
            .and_then(|a| a.top_n)
            .unwrap_or(DEFAULT_TOP_N)
    }

    fn zip_output(&self) -> bool {
        self.load
            .as_ref()
            .and_then(|l| l.compression.as_ref())
            .map(|c| c.enabled)
            .unwrap_or(false)
    }

    fn font_path(&self) -> Option<&str> {
        self.chart.as_ref().and_then(|c| c.font_path.as_deref())
    }

    fn chart_title(&self) -> Option<&str> {
        self.chart.as_ref().and_then(|c| c.title.as_deref())
    }

    fn chart_width(&self) -> Option<u32> {
        self.chart.as_ref().and_then(|c| c.width)
    }

    fn chart_height(&self) -> Option<u32> {
        self.chart.as_ref().and_then(|c| c.height)
    }

    fn font_families(&self) -> Option<&[String]> {
        self.chart.as_ref().and_then(|c| c.font_families.as_deref())
    }

    fn archive_name(&self) -> &str {
        self.load
            .as_ref()
            .and_then(|l| l.compression.as_ref())
            .and_then(|c| c.filename.as_deref())
            .unwrap_or(DEFAULT_ARCHIVE_NAME)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chart::ChartOptions;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_dashboard_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.bind(), "0.0.0.0");
        assert_eq!(config.port(), 8501);
        assert_eq!(config.max_upload_bytes(), 200 * 1024 * 1024);
        assert_eq!(config.top_n(), 10);
        assert_eq!(ChartOptions::from_config(&config).width, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[analysis]
input_path = "logs/WarningsLog.txt"
delimiter = ";"
timestamp_formats = ["%Y%m%d %H%M%S"]
top_n = 3
start = "2024-03-05 10:00"

[chart]
width = 1200
title = "警告趨勢"
font_families = ["Noto Sans CJK JP", "sans-serif"]

[dashboard]
port = 9000
max_upload_mb = 5
log_format = "json"

[load]
output_path = "./reports"
output_formats = ["csv", "svg"]

[load.compression]
enabled = true
filename = "warnings.zip"

[monitoring]
enabled = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.input_path(), "logs/WarningsLog.txt");
        assert_eq!(config.delimiter(), b';');
        assert_eq!(config.top_n(), 3);
        assert_eq!(config.range_start(), Some("2024-03-05 10:00"));
        assert!(config.range_end().is_none());
        assert_eq!(config.port(), 9000);
        assert_eq!(config.max_upload_bytes(), 5 * 1024 * 1024);
        assert!(config.json_logs());
        assert!(config.zip_output());
        assert_eq!(config.archive_name(), "warnings.zip");
        assert!(config.monitoring_enabled());

        let chart = ChartOptions::from_config(&config);
        assert_eq!(chart.width, 1200);
        assert_eq!(chart.height, 500);
        assert_eq!(chart.title.as_deref(), Some("警告趨勢"));
        assert_eq!(chart.font_families[0], "Noto Sans CJK JP");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("WARNINGS_TEST_OUTPUT_DIR", "/tmp/warnings-report");

        let toml_content = r#"
[load]
output_path = "${WARNINGS_TEST_OUTPUT_DIR}"
output_formats = ["json"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.output_path(), "/tmp/warnings-report");

        std::env::remove_var("WARNINGS_TEST_OUTPUT_DIR");
    }

    #[test]
    fn test_config_validation() {
        let bad_format = r#"
[load]
output_path = "./output"
output_formats = ["xlsx"]
"#;
        let config = TomlConfig::from_toml_str(bad_format).unwrap();
        assert!(config.validate().is_err());

        let bad_input = r#"
[analysis]
input_path = "WarningsLog.pdf"
"#;
        let config = TomlConfig::from_toml_str(bad_input).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_upload_limit_is_bounded() {
        let huge = TomlConfig::from_toml_str(
            "[dashboard]\nmax_upload_mb = 9223372036854775807\n",
        )
        .unwrap();
        let err = huge.validate().unwrap_err();
        match err {
            AnalyzerError::InvalidConfigValueError { field, .. } => {
                assert_eq!(field, "dashboard.max_upload_mb")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(huge.max_upload_bytes(), usize::MAX);

        let largest = TomlConfig::from_toml_str("[dashboard]\nmax_upload_mb = 4096\n").unwrap();
        assert!(largest.validate().is_ok());
        assert_eq!(largest.max_upload_bytes(), 4096 * 1024 * 1024);

        let zero = TomlConfig::from_toml_str("[dashboard]\nmax_upload_mb = 0\n").unwrap();
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[dashboard\nport = 1").unwrap_err();
        assert!(matches!(err, AnalyzerError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[dashboard]\nbind = \"127.0.0.1\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.bind(), "127.0.0.1");
    }
}
