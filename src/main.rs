use clap::Parser;
use warnings_analyzer::core::ConfigProvider;
use warnings_analyzer::utils::{logger, validation::Validate};
use warnings_analyzer::{
    AnalysisEngine, AnalyzerError, CliConfig, LocalStorage, LogFilePipeline, TomlConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting warnings-analyzer CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let result = match cli.config.clone() {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let config = match TomlConfig::from_file(&path) {
                Ok(config) => apply_overrides(config, &cli),
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path, e);
                    eprintln!("💡 Make sure the file exists and is valid TOML format");
                    std::process::exit(1);
                }
            };
            if config.input_path().is_empty() {
                exit_with(&AnalyzerError::MissingConfigError {
                    field: "analysis.input_path".to_string(),
                });
            }
            let monitor = cli.monitor || config.monitoring_enabled();
            execute(config, monitor, cli.dry_run).await
        }
        None => {
            let monitor = cli.monitor;
            let dry_run = cli.dry_run;
            execute(cli, monitor, dry_run).await
        }
    };

    match result {
        Ok(output_path) => {
            if let Some(output_path) = output_path {
                tracing::info!("✅ Analysis completed successfully!");
                tracing::info!("📁 Output saved to: {}", output_path);
                println!("✅ Analysis completed successfully!");
                println!("📁 Output saved to: {}", output_path);
            }
        }
        Err(e) => exit_with(&e),
    }

    Ok(())
}

/// Explicit command-line values win over the file.
fn apply_overrides(mut config: TomlConfig, cli: &CliConfig) -> TomlConfig {
    let analysis = config.analysis.get_or_insert_with(Default::default);
    if let Some(input) = &cli.input {
        analysis.input_path = Some(input.clone());
    }
    if let Some(start) = &cli.start {
        analysis.start = Some(start.clone());
    }
    if let Some(end) = &cli.end {
        analysis.end = Some(end.clone());
    }

    if cli.font.is_some() || cli.title.is_some() {
        let chart = config.chart.get_or_insert_with(Default::default);
        if let Some(font) = &cli.font {
            chart.font_path = Some(font.clone());
        }
        if let Some(title) = &cli.title {
            chart.title = Some(title.clone());
        }
    }
    config
}

async fn execute<C>(
    config: C,
    monitor: bool,
    dry_run: bool,
) -> Result<Option<String>, AnalyzerError>
where
    C: ConfigProvider + Validate + 'static,
{
    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        return Err(e);
    }

    if monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    display_config_summary(&config, dry_run);

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = LogFilePipeline::new(storage, config);
    let engine = AnalysisEngine::new_with_monitoring(pipeline, monitor);

    if dry_run {
        tracing::info!("🔍 DRY RUN MODE - No outputs will be written");
        let report = engine.preview().await?;
        print_dry_run(&report.analysis);
        return Ok(None);
    }

    engine.run().await.map(Some)
}

fn display_config_summary<C: ConfigProvider>(config: &C, dry_run: bool) {
    println!("📋 Configuration Summary:");
    println!("  Input: {}", config.input_path());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    println!(
        "  Range: {} ~ {}",
        config.range_start().unwrap_or("(first minute)"),
        config.range_end().unwrap_or("(last minute)")
    );
    if !config.timestamp_formats().is_empty() {
        println!(
            "  Extra timestamp formats: {}",
            config.timestamp_formats().join(" | ")
        );
    }
    if let Some(font) = config.font_path() {
        println!("  Font: {}", font);
    }
    if config.zip_output() {
        println!("  Archive: {}", config.archive_name());
    }
    if dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}

fn print_dry_run(analysis: &warnings_analyzer::core::Analysis) {
    println!("🔍 Dry Run Analysis:");
    match analysis.range {
        Some(range) => println!(
            "  時間範圍: {} ~ {}",
            range.start.format("%Y-%m-%d %H:%M"),
            range.end.format("%Y-%m-%d %H:%M")
        ),
        None => println!("  時間範圍: (無有效時間戳)"),
    }
    println!("  筆數：{}", analysis.matched_records);
    println!("  Minute buckets: {}", analysis.per_minute.len());
    println!("  Dropped rows: {}", analysis.dropped_rows);
    if let Some(peak) = analysis.peak() {
        println!(
            "  Peak: {} ({} records)",
            peak.minute.format("%Y-%m-%d %H:%M"),
            peak.count
        );
    }
    println!();
    println!("✅ Dry run complete. Remove --dry-run to write reports.");
}

fn exit_with(e: &AnalyzerError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Analysis failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    std::process::exit(e.exit_code());
}
