use clap::Parser;
use tokio::net::TcpListener;
use warnings_analyzer::dashboard::{self, AppState, DashboardSettings};
use warnings_analyzer::utils::{logger, validation::Validate};
use warnings_analyzer::TomlConfig;

#[derive(Parser)]
#[command(name = "warnings-dashboard")]
#[command(about = "Web dashboard for exploring warnings logs by minute")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Address to bind, overrides [dashboard].bind
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on, overrides [dashboard].port
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match &args.config {
        Some(path) => match TomlConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path, e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        },
        None => TomlConfig::default(),
    };

    // 應用命令列覆蓋設定
    if args.bind.is_some() || args.port.is_some() {
        let dashboard = config.dashboard.get_or_insert_with(Default::default);
        if let Some(bind) = &args.bind {
            dashboard.bind = Some(bind.clone());
        }
        if let Some(port) = args.port {
            dashboard.port = Some(port);
        }
    }

    logger::init_server_logger(args.verbose, args.json_logs || config.json_logs());

    tracing::info!("🚀 Starting warnings dashboard");

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let settings = match DashboardSettings::from_config(&config).await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };

    let addr = format!("{}:{}", config.bind(), config.port());
    let listener = TcpListener::bind(&addr).await?;

    dashboard::serve(listener, AppState::new(settings), dashboard::shutdown_signal()).await?;

    tracing::info!("👋 Dashboard stopped");
    Ok(())
}
