use std::sync::Arc;

use sysaudit_core::report::ReportWriter;
use sysaudit_core::scripting::SystemLauncher;
use sysaudit_core::{PdfReportWriter, RegistryStore};
use sysaudit_pipeline::{AuditCoordinator, CoordinatorConfig};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Runs audits and produces their event streams.
    pub coordinator: Arc<AuditCoordinator<SystemLauncher>>,
    /// Read access to `scripts.json` for listing.
    pub registry: RegistryStore,
}

impl AppState {
    /// Wire the coordinator, launcher and report writer from `config`.
    pub fn new(config: ServerConfig) -> Self {
        let launcher = SystemLauncher::new(&config.shell_program, &config.powershell_program);
        let report_writer: Arc<dyn ReportWriter> = Arc::new(PdfReportWriter::new(&config.reports_dir));
        let coordinator = AuditCoordinator::new(
            CoordinatorConfig {
                scripts_root: config.scripts_dir.clone(),
                script_timeout: config.script_timeout(),
            },
            launcher,
            report_writer,
        );

        Self {
            registry: RegistryStore::new(&config.scripts_dir),
            coordinator: Arc::new(coordinator),
            config: Arc::new(config),
        }
    }
}
