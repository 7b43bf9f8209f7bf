//! Route definitions for running audits and fetching their reports.

use axum::routing::get;
use axum::Router;

use crate::handlers::{audit, reports};
use crate::state::AppState;

/// ```text
/// GET /stream_output      -> stream_output (text/event-stream)
/// GET /download_report    -> download_report (attachment)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stream_output", get(audit::stream_output))
        .route("/download_report", get(reports::download_report))
}
