//! Route definitions for platform detection and script listing.

use axum::routing::get;
use axum::Router;

use crate::handlers::scripts;
use crate::state::AppState;

/// ```text
/// GET /detect_os      -> detect_os
/// GET /get_scripts    -> list_scripts
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/detect_os", get(scripts::detect_os))
        .route("/get_scripts", get(scripts::list_scripts))
}
