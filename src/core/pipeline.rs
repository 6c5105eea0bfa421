use crate::core::aggregate::{analyze, AnalysisOptions};
use crate::core::chart::{render_svg, ChartOptions, FontAsset};
use crate::core::parser::{parse_log, parse_range_bound, ParserOptions};
use crate::core::{
    Analysis, AnalysisReport, ConfigProvider, Pipeline, Storage, WarningLog, CHART_SVG,
    PER_MINUTE_CSV, SUMMARY_JSON,
};
use crate::utils::error::{AnalyzerError, Result};
use crate::utils::validation::OUTPUT_FORMATS;
use std::io::Write;
use std::path::Path;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Reads one warnings log from storage and writes the per-minute reports back.
pub struct LogFilePipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> LogFilePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            delimiter: self.config.delimiter(),
            extra_formats: self.config.timestamp_formats().to_vec(),
        }
    }

    fn analysis_options(&self) -> Result<AnalysisOptions> {
        let formats = self.config.timestamp_formats();
        Ok(AnalysisOptions {
            start: parse_range_bound("start", self.config.range_start(), formats)?,
            end: parse_range_bound("end", self.config.range_end(), formats)?,
            top_n: self.config.top_n(),
        })
    }

    async fn chart_options(&self) -> Result<ChartOptions> {
        let mut options = ChartOptions::from_config(&self.config);
        if let Some(font_path) = self.config.font_path() {
            let bytes = self.storage.read_file(font_path).await?;
            let font = FontAsset::from_file(font_path, bytes)?;
            tracing::debug!("Embedding font '{}' ({} bytes)", font.family, font.bytes.len());
            options.font = Some(font);
        }
        Ok(options)
    }
}

pub fn render_per_minute_csv(analysis: &Analysis) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["minute", "count"])?;
    for entry in &analysis.per_minute {
        writer.write_record([
            entry.minute.format("%Y-%m-%d %H:%M").to_string(),
            entry.count.to_string(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| AnalyzerError::ProcessingError {
        message: format!("failed to flush CSV writer: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| AnalyzerError::ProcessingError {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}

pub fn render_summary_json(analysis: &Analysis) -> Result<String> {
    Ok(serde_json::to_string_pretty(analysis)?)
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for LogFilePipeline<S, C> {
    async fn extract(&self) -> Result<WarningLog> {
        let input_path = self.config.input_path();
        tracing::debug!("Reading warnings log from: {}", input_path);

        let data = self.storage.read_file(input_path).await?;
        let source_name = Path::new(input_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(input_path);

        parse_log(source_name, &data, &self.parser_options())
    }

    async fn transform(&self, log: WarningLog) -> Result<AnalysisReport> {
        let analysis = analyze(&log, &self.analysis_options()?)?;

        if analysis.range.is_none() {
            tracing::warn!("⚠️ {} has no rows with a valid timestamp", log.source_name);
        } else {
            tracing::info!("筆數：{}", analysis.matched_records);
        }

        let chart_svg = render_svg(&analysis.per_minute, &self.chart_options().await?);
        Ok(AnalysisReport {
            analysis,
            chart_svg,
        })
    }

    async fn load(&self, report: AnalysisReport) -> Result<String> {
        let mut formats: Vec<&str> = Vec::new();
        if self.config.output_formats().is_empty() {
            formats.extend_from_slice(OUTPUT_FORMATS);
        } else {
            for format in self.config.output_formats() {
                if !formats.contains(&format.as_str()) {
                    formats.push(format.as_str());
                }
            }
        }

        let mut files: Vec<(&str, Vec<u8>)> = Vec::new();
        for format in formats {
            match format {
                "csv" => files.push((
                    PER_MINUTE_CSV,
                    render_per_minute_csv(&report.analysis)?.into_bytes(),
                )),
                "json" => files.push((
                    SUMMARY_JSON,
                    render_summary_json(&report.analysis)?.into_bytes(),
                )),
                "svg" => files.push((CHART_SVG, report.chart_svg.as_bytes().to_vec())),
                other => {
                    return Err(AnalyzerError::InvalidConfigValueError {
                        field: "output_formats".to_string(),
                        value: other.to_string(),
                        reason: format!("Valid formats: {}", OUTPUT_FORMATS.join(", ")),
                    })
                }
            }
        }

        let output_path = self.config.output_path();
        if self.config.zip_output() {
            let archive_name = self.config.archive_name();
            tracing::debug!("Creating ZIP file with {} files", files.len());

            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, data) in &files {
                    zip.start_file(*name, SimpleFileOptions::default())?;
                    zip.write_all(data)?;
                }
                zip.finish()?.into_inner()
            };

            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(archive_name, &zip_data).await?;
            return Ok(format!("{}/{}", output_path.trim_end_matches('/'), archive_name));
        }

        for (name, data) in &files {
            self.storage.write_file(name, data).await?;
            tracing::debug!("Wrote {} ({} bytes)", name, data.len());
        }
        Ok(output_path.to_string())
    }
}
