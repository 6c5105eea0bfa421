#![cfg(feature = "cli")]

use anyhow::Result;
use clap::Parser;
use std::io::Read;
use tempfile::TempDir;
use warnings_analyzer::core::ConfigProvider;
use warnings_analyzer::utils::validation::Validate;
use warnings_analyzer::{
    AnalysisEngine, AnalyzerError, CliConfig, LocalStorage, LogFilePipeline, TomlConfig,
};

const SAMPLE_LOG: &str = "\
2024-03-05 10:00:05,W100,Active,Engine,Caution,Oil,Oil pressure low
2024-03-05 10:00:40,W100,Cleared,Engine,Caution,Oil,Oil pressure ok
2024-03-05 10:01:10,W200,Active,Nav,Warning,GPS,GPS signal lost
not-a-time,W300,Active,Nav,Warning,GPS,garbage row
2024-03-05 10:03:59,W200,Active,Nav,Warning,GPS,GPS signal lost
";

fn write_sample(dir: &TempDir) -> Result<String> {
    let path = dir.path().join("WarningsLog.txt");
    std::fs::write(&path, SAMPLE_LOG)?;
    Ok(path.to_string_lossy().into_owned())
}

#[tokio::test]
async fn test_end_to_end_writes_all_reports() -> Result<()> {
    let input_dir = TempDir::new()?;
    let output_dir = TempDir::new()?;
    let input = write_sample(&input_dir)?;
    let output_path = output_dir.path().to_string_lossy().into_owned();

    let config = CliConfig::parse_from([
        "warnings-analyzer",
        "--input",
        &input,
        "--output-path",
        &output_path,
    ]);
    config.validate()?;

    let storage = LocalStorage::new(output_path.clone());
    let pipeline = LogFilePipeline::new(storage, config);
    let engine = AnalysisEngine::new_with_monitoring(pipeline, false);

    let result = engine.run().await?;
    assert_eq!(result, output_path);

    let csv = std::fs::read_to_string(output_dir.path().join("per_minute.csv"))?;
    assert_eq!(
        csv,
        "minute,count\n2024-03-05 10:00,2\n2024-03-05 10:01,1\n2024-03-05 10:03,1\n"
    );

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output_dir.path().join("summary.json"))?)?;
    assert_eq!(summary["source_name"], "WarningsLog.txt");
    assert_eq!(summary["matched_records"], 4);
    assert_eq!(summary["dropped_rows"], 1);

    let svg = std::fs::read_to_string(output_dir.path().join("chart.svg"))?;
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("10:03"));

    Ok(())
}

#[tokio::test]
async fn test_range_and_zip_bundle() -> Result<()> {
    let input_dir = TempDir::new()?;
    let output_dir = TempDir::new()?;
    let input = write_sample(&input_dir)?;
    let output_path = output_dir.path().to_string_lossy().into_owned();

    let config = CliConfig::parse_from([
        "warnings-analyzer",
        "--input",
        &input,
        "--output-path",
        &output_path,
        "--start",
        "2024-03-05 10:01",
        "--end",
        "2024-03-05 10:03",
        "--zip",
    ]);

    let engine = AnalysisEngine::new(LogFilePipeline::new(
        LocalStorage::new(output_path.clone()),
        config,
    ));
    let archive_path = engine.run().await?;
    assert!(archive_path.ends_with("warnings_report.zip"));

    let file = std::fs::File::open(output_dir.path().join("warnings_report.zip"))?;
    let mut archive = zip::ZipArchive::new(file)?;
    assert_eq!(archive.len(), 3);

    let mut csv = String::new();
    archive.by_name("per_minute.csv")?.read_to_string(&mut csv)?;
    assert_eq!(csv, "minute,count\n2024-03-05 10:01,1\n2024-03-05 10:03,1\n");

    let mut json = String::new();
    archive.by_name("summary.json")?.read_to_string(&mut json)?;
    let summary: serde_json::Value = serde_json::from_str(&json)?;
    assert_eq!(summary["matched_records"], 2);
    assert_eq!(summary["total_records"], 4);

    Ok(())
}

#[tokio::test]
async fn test_inverted_range_fails_before_writing() -> Result<()> {
    let input_dir = TempDir::new()?;
    let output_dir = TempDir::new()?;
    let input = write_sample(&input_dir)?;
    let output_path = output_dir.path().to_string_lossy().into_owned();

    let config = CliConfig::parse_from([
        "warnings-analyzer",
        "--input",
        &input,
        "--output-path",
        &output_path,
        "--start",
        "2024-03-05 10:03",
        "--end",
        "2024-03-05 10:00",
    ]);

    let engine = AnalysisEngine::new(LogFilePipeline::new(
        LocalStorage::new(output_path.clone()),
        config,
    ));
    let err = engine.run().await.unwrap_err();

    assert!(matches!(err, AnalyzerError::TimeRangeError { .. }));
    assert_eq!(err.exit_code(), 2);
    assert!(!output_dir.path().join("per_minute.csv").exists());

    Ok(())
}

#[tokio::test]
async fn test_start_after_last_record_counts_nothing() -> Result<()> {
    let input_dir = TempDir::new()?;
    let output_dir = TempDir::new()?;
    let input = write_sample(&input_dir)?;
    let output_path = output_dir.path().to_string_lossy().into_owned();

    let config = CliConfig::parse_from([
        "warnings-analyzer",
        "--input",
        &input,
        "--output-path",
        &output_path,
        "--start",
        "2024-03-06 00:00",
        "--output-formats",
        "csv,json",
    ]);

    let engine = AnalysisEngine::new(LogFilePipeline::new(
        LocalStorage::new(output_path.clone()),
        config,
    ));
    engine.run().await?;

    let csv = std::fs::read_to_string(output_dir.path().join("per_minute.csv"))?;
    assert_eq!(csv, "minute,count\n");

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output_dir.path().join("summary.json"))?)?;
    assert_eq!(summary["matched_records"], 0);
    assert_eq!(summary["total_records"], 4);

    Ok(())
}

#[tokio::test]
async fn test_toml_config_drives_pipeline() -> Result<()> {
    let input_dir = TempDir::new()?;
    let output_dir = TempDir::new()?;
    let input = write_sample(&input_dir)?;
    let output_path = output_dir.path().to_string_lossy().into_owned();

    let toml_content = format!(
        r#"
[analysis]
input_path = "{input}"
top_n = 1

[chart]
title = "引擎警告"

[load]
output_path = "{output_path}"
output_formats = ["json", "svg"]
"#
    );
    let config = TomlConfig::from_toml_str(&toml_content)?;
    config.validate()?;
    assert_eq!(config.top_n(), 1);

    let engine = AnalysisEngine::new(LogFilePipeline::new(
        LocalStorage::new(config.output_path().to_string()),
        config,
    ));
    engine.run().await?;

    assert!(!output_dir.path().join("per_minute.csv").exists());
    let svg = std::fs::read_to_string(output_dir.path().join("chart.svg"))?;
    assert!(svg.contains("引擎警告"));

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output_dir.path().join("summary.json"))?)?;
    let breakdowns = summary["breakdowns"]
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("breakdowns missing"))?;
    assert!(!breakdowns.is_empty());
    for breakdown in breakdowns {
        assert_eq!(breakdown["entries"].as_array().map(Vec::len), Some(1));
    }

    Ok(())
}

#[tokio::test]
async fn test_dry_run_preview_writes_nothing() -> Result<()> {
    let input_dir = TempDir::new()?;
    let output_dir = TempDir::new()?;
    let input = write_sample(&input_dir)?;
    let output_path = output_dir.path().join("out").to_string_lossy().into_owned();

    let config = CliConfig::parse_from([
        "warnings-analyzer",
        "--input",
        &input,
        "--output-path",
        &output_path,
        "--dry-run",
    ]);
    let engine = AnalysisEngine::new(LogFilePipeline::new(
        LocalStorage::new(output_path.clone()),
        config,
    ));

    let report = engine.preview().await?;
    assert_eq!(report.analysis.matched_records, 4);
    assert_eq!(report.analysis.peak().map(|p| p.count), Some(2));
    assert!(!std::path::Path::new(&output_path).exists());

    Ok(())
}
