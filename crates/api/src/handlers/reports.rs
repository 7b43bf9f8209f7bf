//! Serving generated reports.

use std::path::Path;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::Response;
use serde::Deserialize;
use sysaudit_core::paths;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

const NOT_FOUND_MESSAGE: &str = "Report not found or unauthorized";

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub path: Option<String>,
}

/// GET /download_report?path=<report path>
///
/// Streams the report as an attachment. The path must resolve to a file
/// inside the reports directory; anything else is answered with 404.
pub async fn download_report(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> AppResult<Response> {
    let requested = params
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("Path parameter is missing".to_string()))?;

    let path = match paths::resolve_within(&state.config.reports_dir, Path::new(&requested)) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(path = %requested, error = %e, "Rejected report download");
            return Err(AppError::NotFound(NOT_FOUND_MESSAGE.to_string()));
        }
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Report could not be opened");
            return Err(AppError::NotFound(NOT_FOUND_MESSAGE.to_string()));
        }
    };
    let metadata = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    if !metadata.is_file() {
        tracing::warn!(path = %path.display(), "Rejected report download of non-file");
        return Err(AppError::NotFound(NOT_FOUND_MESSAGE.to_string()));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().replace('"', ""))
        .unwrap_or_else(|| "report".to_string());
    let content_type = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => "application/pdf",
        _ => "application/octet-stream",
    };

    tracing::info!(path = %path.display(), bytes = metadata.len(), "Serving report");

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, metadata.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::InternalError(e.to_string()))
}
