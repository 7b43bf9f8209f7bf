//! Handlers for platform detection and the script catalogue.

use axum::extract::{Query, State};
use axum::Json;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sysaudit_core::{Platform, ScriptRegistry};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListScriptsParams {
    pub os: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DetectOsResponse {
    pub os: Platform,
}

/// Listing entry, keyed by script id in [`ListScriptsResponse`].
#[derive(Debug, Serialize)]
pub struct ScriptSummary {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ListScriptsResponse {
    pub scripts: IndexMap<String, ScriptSummary>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /detect_os
///
/// Platform of the machine the server runs on.
pub async fn detect_os() -> AppResult<Json<DetectOsResponse>> {
    match Platform::detect() {
        Some(os) => Ok(Json(DetectOsResponse { os })),
        None => Err(AppError::BadRequest(format!(
            "Unsupported OS: {}",
            std::env::consts::OS
        ))),
    }
}

/// GET /get_scripts?os=<platform>
///
/// Scripts registered for the platform, in registry order. An unknown
/// platform name yields an empty listing.
pub async fn list_scripts(
    State(state): State<AppState>,
    Query(params): Query<ListScriptsParams>,
) -> AppResult<Json<ListScriptsResponse>> {
    let os = params
        .os
        .filter(|os| !os.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("OS parameter is required".to_string()))?;

    let registry = load_registry(&state).await?;
    let scripts = match os.parse::<Platform>() {
        Ok(platform) => registry
            .scripts(platform)
            .into_iter()
            .map(|meta| {
                (
                    meta.id,
                    ScriptSummary {
                        title: meta.title,
                        description: meta.description,
                    },
                )
            })
            .collect(),
        Err(_) => {
            tracing::debug!(os = %os, "Listing requested for unknown platform");
            IndexMap::new()
        }
    };

    Ok(Json(ListScriptsResponse { scripts }))
}

async fn load_registry(state: &AppState) -> AppResult<ScriptRegistry> {
    let store = state.registry.clone();
    tokio::task::spawn_blocking(move || store.snapshot())
        .await
        .map_err(|e| AppError::InternalError(format!("Registry read failed: {e}")))
}
