//! Web dashboard: upload a warnings log, pick a minute range, see the
//! record count and the per-minute chart.

pub mod handlers;
pub mod page;

use crate::config::toml_config::TomlConfig;
use crate::core::chart::{ChartOptions, FontAsset};
use crate::core::parser::ParserOptions;
use crate::core::{ConfigProvider, WarningLog};
use crate::utils::error::{AnalyzerError, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// Settings fixed at startup.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub parser: ParserOptions,
    pub top_n: usize,
    pub chart: ChartOptions,
    pub max_upload_bytes: usize,
}

impl DashboardSettings {
    /// Builds settings from the file config, loading `chart.font_path` if set.
    pub async fn from_config(config: &TomlConfig) -> Result<Self> {
        let mut chart = ChartOptions::from_config(config);
        if let Some(font_path) = config.font_path() {
            let bytes = tokio::fs::read(font_path).await?;
            chart.font = Some(FontAsset::from_file(font_path, bytes)?);
        }
        Ok(Self {
            parser: ParserOptions {
                delimiter: config.delimiter(),
                extra_formats: config.timestamp_formats().to_vec(),
            },
            top_n: config.top_n(),
            chart,
            max_upload_bytes: config.max_upload_bytes(),
        })
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            parser: ParserOptions::default(),
            top_n: crate::config::toml_config::DEFAULT_TOP_N,
            chart: ChartOptions::default(),
            max_upload_bytes: crate::config::toml_config::DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

/// The uploaded log and font currently shown.
#[derive(Debug, Default)]
pub struct Session {
    pub log: Option<Arc<WarningLog>>,
    pub font: Option<FontAsset>,
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<DashboardSettings>,
    pub session: Arc<RwLock<Session>>,
}

impl AppState {
    #[must_use]
    pub fn new(settings: DashboardSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            session: Arc::new(RwLock::new(Session::default())),
        }
    }

    /// Chart options with the uploaded font, falling back to the configured one.
    pub async fn chart_options(&self) -> ChartOptions {
        let mut options = self.settings.chart.clone();
        if let Some(font) = &self.session.read().await.font {
            options.font = Some(font.clone());
        }
        options
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.settings.max_upload_bytes;
    Router::new()
        .route("/", get(handlers::index_handler))
        .route("/upload", post(handlers::upload_handler))
        .route("/font", post(handlers::font_handler))
        .route("/chart.svg", get(handlers::chart_handler))
        .route("/api/analysis", get(handlers::analysis_handler))
        .route("/healthz", get(handlers::healthz_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Serves the dashboard on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("🌐 Dashboard listening on http://{}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AnalyzerError::ServerError {
            message: format!("server failed: {}", e),
        })
}

pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Shutdown signal received");
}
