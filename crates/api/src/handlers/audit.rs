//! Live audit runs over server-sent events.
//!
//! Each [`RunEvent`] becomes one `data: <payload>` frame. The stream ends
//! after the terminal event; closing the connection early cancels the run.

use std::convert::Infallible;

use axum::extract::{RawQuery, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use sysaudit_core::Platform;
use sysaudit_events::RunEvent;
use sysaudit_pipeline::RunRequest;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Query of `/stream_output`. `scripts` may repeat; order is kept.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StreamParams {
    pub os: Option<String>,
    pub scripts: Vec<String>,
}

impl StreamParams {
    /// Parse a raw query string, keeping every `scripts` value.
    pub fn parse(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "os" => params.os = Some(value.into_owned()),
                "scripts" => params.scripts.push(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

/// GET /stream_output?os=<platform>&scripts=<id>&scripts=<id>...
pub async fn stream_output(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let params = StreamParams::parse(query.as_deref().unwrap_or_default());
    let os = params
        .os
        .filter(|os| !os.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("OS parameter is required".to_string()))?;
    let platform: Platform = os.parse()?;

    tracing::info!(
        %platform,
        scripts = ?params.scripts,
        "Starting audit stream",
    );

    let events = state.coordinator.run(RunRequest {
        platform,
        script_ids: params.scripts,
    });
    let frames = events.map(|event| Ok(Event::default().data(frame_payload(&event))));

    Ok(Sse::new(frames).keep_alive(KeepAlive::default()))
}

/// Wire payload of an event. Carriage returns cannot be carried in an SSE
/// data field and are dropped.
fn frame_payload(event: &RunEvent) -> String {
    event.to_string().replace('\r', "")
}
