pub mod audit;
pub mod health;
pub mod scripts;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /detect_os                     platform of this host (GET)
/// /get_scripts?os=               registered scripts for a platform (GET)
/// /stream_output?os=&scripts=    run scripts, live event stream (GET)
/// /download_report?path=         fetch a generated report (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(scripts::router())
        .merge(audit::router())
}
