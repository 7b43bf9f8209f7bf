#![allow(dead_code)]

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sysaudit_core::registry::ScriptEntry;
use sysaudit_core::{Platform, RegistryStore};
use tempfile::TempDir;
use tower::ServiceExt;

use sysaudit_api::config::ServerConfig;
use sysaudit_api::router::build_app_router;
use sysaudit_api::state::AppState;

/// Scratch scripts and reports directories for one test.
pub struct TestDirs {
    pub scripts: TempDir,
    pub reports: TempDir,
}

impl TestDirs {
    pub fn new() -> Self {
        Self {
            scripts: tempfile::tempdir().expect("scripts dir"),
            reports: tempfile::tempdir().expect("reports dir"),
        }
    }

    /// Write `<scripts>/<platform>/<id>` and register it.
    pub fn add_script(&self, platform: Platform, id: &str, title: &str, body: &str) -> PathBuf {
        let dir = self.scripts.path().join(platform.as_str());
        std::fs::create_dir_all(&dir).expect("platform dir");
        let path = dir.join(id);
        std::fs::write(&path, body).expect("write script");

        let store = RegistryStore::new(self.scripts.path());
        let mut registry = store.snapshot();
        registry.insert(
            platform,
            id,
            ScriptEntry {
                title: title.to_string(),
                description: format!("{title} check"),
                filename: Some(id.to_string()),
            },
        );
        store.save(&registry).expect("save registry");
        path
    }

    pub fn config(&self) -> ServerConfig {
        test_config(self.scripts.path(), self.reports.path())
    }

    pub fn app(&self) -> Router {
        build_test_app(self.config())
    }
}

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5000` as CORS origin (matching the default)
/// and a 30-second request timeout.
pub fn test_config(scripts_dir: &Path, reports_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5000".to_string()],
        request_timeout_secs: 30,
        scripts_dir: scripts_dir.to_path_buf(),
        reports_dir: reports_dir.to_path_buf(),
        script_timeout_secs: Some(30),
        shell_program: "bash".to_string(),
        powershell_program: "powershell".to_string(),
        log_file: None,
    }
}

/// Build the full application router through the same builder `main.rs`
/// uses, so tests exercise the production middleware stack.
pub fn build_test_app(config: ServerConfig) -> Router {
    let state = AppState::new(config.clone());
    build_app_router(state, &config)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("build request"),
    )
    .await
    .expect("request")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).expect("utf-8 body")
}

/// `data:` payloads of an event-stream body, in order.
pub fn sse_payloads(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}
