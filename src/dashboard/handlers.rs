use crate::core::aggregate::{analyze, AnalysisOptions};
use crate::core::chart::{render_svg, FontAsset};
use crate::core::parser::{parse_log, parse_range_bound};
use crate::core::{Analysis, WarningLog};
use crate::dashboard::page::{render_index, IndexView};
use crate::dashboard::AppState;
use crate::utils::error::{AnalyzerError, ErrorCategory, Result};
use crate::utils::validation::{validate_file_extension, LOG_EXTENSIONS};
use axum::extract::{Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

pub fn status_for(error: &AnalyzerError) -> StatusCode {
    match error {
        AnalyzerError::NoDatasetError => StatusCode::NOT_FOUND,
        AnalyzerError::UnsupportedUploadError { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        AnalyzerError::UploadTooLargeError { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        AnalyzerError::EmptyInputError { .. } | AnalyzerError::CsvError(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => match error.category() {
            ErrorCategory::Input | ErrorCategory::Configuration => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

impl IntoResponse for AnalyzerError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::error!("❌ {}", self);
        } else {
            tracing::warn!("⚠️ {}", self);
        }
        let body = format!(
            "<!DOCTYPE html><html lang=\"zh-Hant\"><meta charset=\"utf-8\"><body><p>❌ {}</p><p>💡 {}</p><p><a href=\"/\">返回</a></p></body></html>",
            crate::core::chart::escape_xml(&self.user_friendly_message()),
            crate::core::chart::escape_xml(&self.recovery_suggestion()),
        );
        (status, Html(body)).into_response()
    }
}

/// JSON wrapper for the API routes.
pub struct ApiError(pub AnalyzerError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = serde_json::json!({
            "error": self.0.to_string(),
            "message": self.0.user_friendly_message(),
            "suggestion": self.0.recovery_suggestion(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<AnalyzerError> for ApiError {
    fn from(e: AnalyzerError) -> Self {
        ApiError(e)
    }
}

async fn current_log(state: &AppState) -> Option<Arc<WarningLog>> {
    state.session.read().await.log.clone()
}

fn analyze_range(state: &AppState, log: &WarningLog, query: &RangeQuery) -> Result<Analysis> {
    let formats = &state.settings.parser.extra_formats;
    let options = AnalysisOptions {
        start: parse_range_bound("start", query.start.as_deref(), formats)?,
        end: parse_range_bound("end", query.end.as_deref(), formats)?,
        top_n: state.settings.top_n,
    };
    analyze(log, &options)
}

async fn read_upload(
    state: &AppState,
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<(String, Vec<u8>)> {
    let limit_bytes = state.settings.max_upload_bytes;
    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AnalyzerError::UploadTooLargeError { limit_bytes }
        } else {
            AnalyzerError::UnsupportedUploadError {
                file_name: field_name.to_string(),
                reason: e.body_text(),
            }
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(field_name) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AnalyzerError::UnsupportedUploadError {
                file_name: field_name.to_string(),
                reason: "no file selected".to_string(),
            })?;
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok((file_name, bytes.to_vec()));
    }

    Err(AnalyzerError::UnsupportedUploadError {
        file_name: field_name.to_string(),
        reason: format!("form field '{}' is missing", field_name),
    })
}

pub async fn index_handler(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Html<String> {
    let log = current_log(&state).await;
    let font_family = state
        .session
        .read()
        .await
        .font
        .as_ref()
        .map(|f| f.family.clone());

    let mut view = IndexView {
        log: log.as_deref(),
        analysis: None,
        chart_svg: None,
        font_family,
        error: None,
    };

    if let Some(log) = log.as_deref() {
        match analyze_range(&state, log, &query) {
            Ok(analysis) => {
                let chart = render_svg(&analysis.per_minute, &state.chart_options().await);
                view.chart_svg = Some(chart);
                view.analysis = Some(analysis);
            }
            Err(e) => {
                tracing::warn!("⚠️ {}", e);
                view.error = Some(format!(
                    "{}（{}）",
                    e.user_friendly_message(),
                    e.recovery_suggestion()
                ));
            }
        }
    }

    Html(render_index(&view))
}

pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect> {
    let (file_name, bytes) = read_upload(&state, &mut multipart, "file").await?;
    validate_file_extension("file", &file_name, LOG_EXTENSIONS).map_err(|e| {
        AnalyzerError::UnsupportedUploadError {
            file_name: file_name.clone(),
            reason: e.to_string(),
        }
    })?;

    let parser = state.settings.parser.clone();
    let name = file_name.clone();
    let log = tokio::task::spawn_blocking(move || parse_log(&name, &bytes, &parser))
        .await
        .map_err(|e| AnalyzerError::ServerError {
            message: format!("parser task failed: {}", e),
        })??;

    tracing::info!(
        "📥 Uploaded {}: {} records, {} dropped",
        file_name,
        log.records.len(),
        log.dropped_rows
    );
    state.session.write().await.log = Some(Arc::new(log));

    Ok(Redirect::to("/"))
}

pub async fn font_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect> {
    let (file_name, bytes) = read_upload(&state, &mut multipart, "font").await?;
    let font = FontAsset::from_upload(&file_name, bytes)?;

    tracing::info!("🔤 Font '{}' uploaded ({} bytes)", font.family, font.bytes.len());
    state.session.write().await.font = Some(font);

    Ok(Redirect::to("/"))
}

pub async fn chart_handler(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Response> {
    let log = current_log(&state).await.ok_or(AnalyzerError::NoDatasetError)?;
    let analysis = analyze_range(&state, &log, &query)?;
    let svg = render_svg(&analysis.per_minute, &state.chart_options().await);
    Ok(([(header::CONTENT_TYPE, "image/svg+xml; charset=utf-8")], svg).into_response())
}

pub async fn analysis_handler(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> std::result::Result<Json<Analysis>, ApiError> {
    let log = current_log(&state).await.ok_or(AnalyzerError::NoDatasetError)?;
    Ok(Json(analyze_range(&state, &log, &query)?))
}

pub async fn healthz_handler() -> &'static str {
    "ok"
}
