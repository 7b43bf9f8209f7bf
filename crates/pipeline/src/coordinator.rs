//! Sequential execution of one audit run.
//!
//! Scripts run strictly one after another on the task that owns the event
//! sender. Every fault is turned into a [`RunEvent`]; nothing escapes
//! [`AuditCoordinator::execute`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sysaudit_core::report::ReportWriter;
use sysaudit_core::scripting::{LaunchOptions, ScriptError, ScriptLauncher, ScriptProcess};
use sysaudit_core::{
    Platform, RegistryStore, ResolvedScript, RunResult, ScriptRegistry, ValidationError,
};
use sysaudit_events::{wire, EventSender, EventStream, RunEvent, StreamClosed};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One requested run. Duplicate ids are allowed and run each time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub platform: Platform,
    pub script_ids: Vec<String>,
}

impl RunRequest {
    pub fn new<I, S>(platform: Platform, script_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            platform,
            script_ids: script_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Static settings for the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Root holding `scripts.json` and one directory per platform.
    pub scripts_root: PathBuf,
    /// Optional wall-clock limit per script.
    pub script_timeout: Option<Duration>,
}

/// Why a run stopped before reaching its report.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The consumer went away.
    #[error("event consumer disconnected")]
    Disconnected,

    /// The in-flight script was killed because the run was cancelled.
    #[error("run cancelled")]
    Cancelled,

    /// Unexpected fault; reported to the consumer as a terminal failure.
    #[error("{0}")]
    Fatal(String),
}

impl From<StreamClosed> for RunError {
    fn from(_: StreamClosed) -> Self {
        Self::Disconnected
    }
}

/// What interrupted a single script.
enum Interrupted {
    Script(ScriptError),
    Closed,
}

impl From<ScriptError> for Interrupted {
    fn from(e: ScriptError) -> Self {
        Self::Script(e)
    }
}

impl From<StreamClosed> for Interrupted {
    fn from(_: StreamClosed) -> Self {
        Self::Closed
    }
}

// ---------------------------------------------------------------------------
// AuditCoordinator
// ---------------------------------------------------------------------------

/// Drives audit runs through a [`ScriptLauncher`].
pub struct AuditCoordinator<L> {
    config: CoordinatorConfig,
    registry: RegistryStore,
    launcher: L,
    report_writer: Arc<dyn ReportWriter>,
}

impl<L> AuditCoordinator<L>
where
    L: ScriptLauncher + 'static,
{
    pub fn new(config: CoordinatorConfig, launcher: L, report_writer: Arc<dyn ReportWriter>) -> Self {
        let registry = RegistryStore::new(&config.scripts_root);
        Self {
            config,
            registry,
            launcher,
            report_writer,
        }
    }

    /// Start a run in the background and return its event stream.
    ///
    /// A supervising task turns a panic inside the run into a terminal
    /// failure event so the stream always ends.
    pub fn run(self: &Arc<Self>, request: RunRequest) -> EventStream {
        let (sender, stream) = sysaudit_events::channel();
        let sender = Arc::new(sender);
        let coordinator = Arc::clone(self);

        let worker_sender = Arc::clone(&sender);
        let worker = tokio::spawn(async move {
            coordinator.execute(request, &worker_sender).await;
        });

        tokio::spawn(async move {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Audit run task failed");
                if !sender.is_finished() {
                    let _ = sender.emit(RunEvent::fatal(wire::critical_error(
                        "the audit run stopped unexpectedly",
                    )));
                }
            }
        });

        stream
    }

    /// Run `request` to completion on the current task, emitting into
    /// `events`, and return the collected output.
    ///
    /// If the consumer goes away mid-run the in-flight script is killed and
    /// no report is written.
    pub async fn execute(&self, request: RunRequest, events: &EventSender) -> RunResult {
        let cancel = CancellationToken::new();
        let mut results = RunResult::new();

        tracing::info!(
            platform = %request.platform,
            scripts = request.script_ids.len(),
            "Audit run started",
        );

        let outcome = {
            let drive = self.drive(&request, events, &cancel, &mut results);
            tokio::pin!(drive);
            tokio::select! {
                outcome = &mut drive => outcome,
                () = events.closed() => {
                    cancel.cancel();
                    drive.await
                }
            }
        };

        match outcome {
            Ok(()) => {
                tracing::info!(scripts = results.len(), "Audit run finished");
            }
            Err(RunError::Disconnected | RunError::Cancelled) => {
                tracing::info!(scripts = results.len(), "Audit run abandoned by consumer");
            }
            Err(RunError::Fatal(detail)) => {
                tracing::error!(
                    platform = %request.platform,
                    error = %detail,
                    "Audit run failed",
                );
                let _ = events.emit(RunEvent::fatal(wire::critical_error(detail)));
            }
        }

        results
    }

    async fn drive(
        &self,
        request: &RunRequest,
        events: &EventSender,
        cancel: &CancellationToken,
        results: &mut RunResult,
    ) -> Result<(), RunError> {
        events.emit(RunEvent::info(wire::RUN_STARTED))?;

        let store = self.registry.clone();
        let registry = tokio::task::spawn_blocking(move || store.snapshot())
            .await
            .map(Arc::new)
            .map_err(|e| RunError::Fatal(format!("registry snapshot failed: {e}")))?;

        for script_id in &request.script_ids {
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }

            let resolved = resolve_script(
                Arc::clone(&registry),
                self.config.scripts_root.clone(),
                request.platform,
                script_id.clone(),
            )
            .await?;
            let script = match resolved {
                Ok(script) => script,
                Err(e) => {
                    tracing::warn!(
                        platform = %request.platform,
                        script_id = %script_id,
                        error = %e,
                        "Rejected requested script",
                    );
                    events.emit(RunEvent::script_failure(script_id, e.reason()))?;
                    continue;
                }
            };

            events.emit(RunEvent::info(wire::running_banner(
                &script.metadata.title,
                script_id,
            )))?;
            self.run_script(request.platform, &script, events, cancel, results)
                .await?;
        }

        if cancel.is_cancelled() || events.is_closed() {
            return Err(RunError::Cancelled);
        }

        events.emit(RunEvent::info(wire::GENERATING_REPORT))?;
        match self.write_report(request.platform, results).await {
            Some(path) => {
                events.emit(RunEvent::info(wire::RUN_COMPLETED))?;
                events.emit(RunEvent::report_ready(path))?;
            }
            None => {
                events.emit(RunEvent::fatal(wire::REPORT_FAILED))?;
            }
        }
        Ok(())
    }

    /// Run one validated script. Per-script faults become a failure event
    /// and the run continues.
    async fn run_script(
        &self,
        platform: Platform,
        script: &ResolvedScript,
        events: &EventSender,
        cancel: &CancellationToken,
        results: &mut RunResult,
    ) -> Result<(), RunError> {
        let script_id = script.metadata.id.as_str();
        let options = LaunchOptions {
            timeout: self.config.script_timeout,
            cancel: cancel.clone(),
        };

        match self.supervise(platform, script, options, events, results).await {
            Ok(0) => {
                tracing::debug!(script_id, "Script finished");
                Ok(())
            }
            Ok(code) => {
                tracing::info!(script_id, exit_code = code, "Script exited with non-zero status");
                events.emit(RunEvent::warning(script_id, code))?;
                Ok(())
            }
            Err(Interrupted::Closed) => Err(RunError::Disconnected),
            Err(Interrupted::Script(ScriptError::Cancelled)) => Err(RunError::Cancelled),
            Err(Interrupted::Script(e)) if e.is_per_script() => {
                tracing::warn!(script_id, error = %e, "Script failed");
                events.emit(RunEvent::script_failure(script_id, e.to_string()))?;
                Ok(())
            }
            Err(Interrupted::Script(e)) => Err(RunError::Fatal(e.to_string())),
        }
    }

    async fn supervise(
        &self,
        platform: Platform,
        script: &ResolvedScript,
        options: LaunchOptions,
        events: &EventSender,
        results: &mut RunResult,
    ) -> Result<i32, Interrupted> {
        let script_id = script.metadata.id.as_str();
        let mut process = self.launcher.launch(platform, &script.path, options).await?;
        results.begin(script_id);

        while let Some(line) = process.next_line().await? {
            let line = line.trim();
            results.push_line(script_id, line);
            events.emit(RunEvent::line(script_id, line))?;
        }

        Ok(process.wait().await?)
    }

    /// Hand the results to the report writer off the async runtime.
    async fn write_report(&self, platform: Platform, results: &RunResult) -> Option<PathBuf> {
        let writer = Arc::clone(&self.report_writer);
        let snapshot = results.clone();
        match tokio::task::spawn_blocking(move || writer.generate(platform, &snapshot)).await {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(error = %e, "Report writer task failed");
                None
            }
        }
    }
}

/// Validate one script id against the snapshot. The checks touch the
/// filesystem, so they run on the blocking pool.
async fn resolve_script(
    registry: Arc<ScriptRegistry>,
    scripts_root: PathBuf,
    platform: Platform,
    script_id: String,
) -> Result<Result<ResolvedScript, ValidationError>, RunError> {
    tokio::task::spawn_blocking(move || registry.resolve(&scripts_root, platform, &script_id))
        .await
        .map_err(|e| RunError::Fatal(format!("script validation failed: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use sysaudit_core::registry::ScriptEntry;

    use super::*;

    #[test]
    fn run_request_keeps_order_and_duplicates() {
        let request = RunRequest::new(Platform::Linux, ["b.sh", "a.sh", "b.sh"]);
        assert_eq!(request.script_ids, vec!["b.sh", "a.sh", "b.sh"]);
    }

    #[test]
    fn stream_closed_maps_to_disconnected() {
        let err: RunError = StreamClosed.into();
        assert!(matches!(err, RunError::Disconnected));
    }

    #[test]
    fn fatal_error_displays_detail() {
        assert_eq!(RunError::Fatal("pipe broke".into()).to_string(), "pipe broke");
    }

    fn registry_with(id: &str) -> Arc<ScriptRegistry> {
        let mut registry = ScriptRegistry::default();
        registry.insert(
            Platform::Linux,
            id,
            ScriptEntry {
                title: "Uptime".into(),
                ..ScriptEntry::default()
            },
        );
        Arc::new(registry)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn resolve_script_accepts_registered_file() {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(root.path().join("Linux")).expect("platform dir");
        std::fs::write(root.path().join("Linux/uptime.sh"), "uptime\n").expect("script");

        let resolved = resolve_script(
            registry_with("uptime.sh"),
            root.path().to_path_buf(),
            Platform::Linux,
            "uptime.sh".into(),
        )
        .await
        .expect("validation task")
        .expect("resolved");

        assert_eq!(resolved.metadata.title, "Uptime");
        assert!(resolved.path.ends_with("Linux/uptime.sh"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn resolve_script_rejects_missing_file() {
        let root = tempfile::tempdir().expect("tempdir");

        let resolved = resolve_script(
            registry_with("gone.sh"),
            root.path().to_path_buf(),
            Platform::Linux,
            "gone.sh".into(),
        )
        .await
        .expect("validation task");

        assert!(matches!(resolved, Err(ValidationError::MissingFile { .. })));
    }
}
