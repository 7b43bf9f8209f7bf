//! Shared fixtures for coordinator integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sysaudit_core::registry::ScriptEntry;
use sysaudit_core::report::ReportWriter;
use sysaudit_core::scripting::subprocess::RunningScript;
use sysaudit_core::scripting::{LaunchOptions, ScriptError, ScriptLauncher, ScriptProcess, SystemLauncher};
use sysaudit_core::{Platform, RegistryStore, RunResult, ScriptRegistry};
use sysaudit_events::RunEvent;
use sysaudit_pipeline::{AuditCoordinator, CoordinatorConfig, RunRequest};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Scripts directory
// ---------------------------------------------------------------------------

/// A temporary scripts root with a `Linux` directory and `scripts.json`.
pub struct ScriptsDir {
    pub root: TempDir,
    registry: ScriptRegistry,
}

impl ScriptsDir {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create scripts root");
        std::fs::create_dir_all(root.path().join("Linux")).expect("create Linux dir");
        let dir = Self {
            root,
            registry: ScriptRegistry::default(),
        };
        dir.save();
        dir
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Write `Linux/<id>` and register it under `title`.
    pub fn script(mut self, id: &str, title: &str, body: &str) -> Self {
        self.write_file(id, body);
        self.registry.insert(
            Platform::Linux,
            id,
            ScriptEntry {
                title: title.to_string(),
                description: String::new(),
                filename: Some(id.to_string()),
            },
        );
        self.save();
        self
    }

    /// Register an id without writing its file.
    pub fn registered_only(mut self, id: &str) -> Self {
        self.registry.insert(Platform::Linux, id, ScriptEntry::default());
        self.save();
        self
    }

    /// Write a file under `Linux/` without registering it.
    pub fn unregistered(self, id: &str, body: &str) -> Self {
        self.write_file(id, body);
        self
    }

    fn write_file(&self, id: &str, body: &str) {
        let path = self.root.path().join("Linux").join(id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create script parent");
        }
        std::fs::write(path, format!("#!/bin/bash\n{body}")).expect("write script");
    }

    fn save(&self) {
        RegistryStore::new(self.root.path())
            .save(&self.registry)
            .expect("save registry");
    }

    pub fn config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            scripts_root: self.root.path().to_path_buf(),
            script_timeout: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Launchers
// ---------------------------------------------------------------------------

/// Real launcher that records every path it was asked to start.
#[derive(Clone, Default)]
pub struct RecordingLauncher {
    inner: SystemLauncher,
    launched: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingLauncher {
    pub fn launched(&self) -> Vec<PathBuf> {
        self.launched.lock().expect("launch log").clone()
    }
}

impl ScriptLauncher for RecordingLauncher {
    type Process = RunningScript;

    async fn launch(
        &self,
        platform: Platform,
        script_path: &Path,
        options: LaunchOptions,
    ) -> Result<RunningScript, ScriptError> {
        self.launched
            .lock()
            .expect("launch log")
            .push(script_path.to_path_buf());
        self.inner.launch(platform, script_path, options).await
    }
}

/// Canned behaviour for [`FakeLauncher`], keyed by script file name.
#[derive(Clone)]
pub enum Behavior {
    /// Yield the lines, then exit with the code.
    Output(Vec<&'static str>, i32),
    /// Yield the lines, then fail reading the pipe.
    BrokenPipe(Vec<&'static str>),
    /// Refuse to start.
    LaunchFails,
    /// Panic while launching.
    Panics,
}

#[derive(Default)]
pub struct FakeLauncher {
    behaviors: HashMap<String, Behavior>,
}

impl FakeLauncher {
    pub fn with(mut self, file_name: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(file_name.to_string(), behavior);
        self
    }
}

pub struct FakeProcess {
    lines: std::collections::VecDeque<&'static str>,
    broken: bool,
    exit_code: i32,
}

impl ScriptProcess for FakeProcess {
    async fn next_line(&mut self) -> Result<Option<String>, ScriptError> {
        match self.lines.pop_front() {
            Some(line) => Ok(Some(line.to_string())),
            None if self.broken => Err(ScriptError::IoError(io::Error::other("pipe broke"))),
            None => Ok(None),
        }
    }

    async fn wait(self) -> Result<i32, ScriptError> {
        Ok(self.exit_code)
    }
}

impl ScriptLauncher for FakeLauncher {
    type Process = FakeProcess;

    async fn launch(
        &self,
        _platform: Platform,
        script_path: &Path,
        _options: LaunchOptions,
    ) -> Result<FakeProcess, ScriptError> {
        let name = script_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        match self.behaviors.get(name).cloned() {
            Some(Behavior::Output(lines, exit_code)) => Ok(FakeProcess {
                lines: lines.into(),
                broken: false,
                exit_code,
            }),
            Some(Behavior::BrokenPipe(lines)) => Ok(FakeProcess {
                lines: lines.into(),
                broken: true,
                exit_code: 0,
            }),
            Some(Behavior::LaunchFails) => Err(ScriptError::Launch {
                program: "fake".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no interpreter"),
            }),
            Some(Behavior::Panics) => panic!("launcher exploded"),
            None => Ok(FakeProcess {
                lines: Default::default(),
                broken: false,
                exit_code: 0,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Report writers
// ---------------------------------------------------------------------------

/// Records what it was asked to write and answers with a fixed outcome.
pub struct RecordingWriter {
    path: Option<PathBuf>,
    calls: Mutex<Vec<(Platform, RunResult)>>,
}

impl RecordingWriter {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            path: Some(PathBuf::from("/srv/reports/audit_report_test.pdf")),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            path: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(Platform, RunResult)> {
        self.calls.lock().expect("writer log").clone()
    }
}

impl ReportWriter for RecordingWriter {
    fn generate(&self, platform: Platform, results: &RunResult) -> Option<PathBuf> {
        self.calls
            .lock()
            .expect("writer log")
            .push((platform, results.clone()));
        self.path.clone()
    }
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

/// Drive a run on the current task and return its events and results.
pub async fn execute<L>(
    coordinator: &AuditCoordinator<L>,
    script_ids: &[&str],
) -> (Vec<RunEvent>, RunResult)
where
    L: ScriptLauncher + 'static,
{
    let (sender, stream) = sysaudit_events::channel();
    let request = RunRequest::new(Platform::Linux, script_ids.iter().copied());
    let results = tokio::time::timeout(
        Duration::from_secs(30),
        coordinator.execute(request, &sender),
    )
    .await
    .expect("run should finish");
    drop(sender);
    (stream.collect_all().await, results)
}

/// Payload texts of `events`.
pub fn texts(events: &[RunEvent]) -> Vec<String> {
    events.iter().map(ToString::to_string).collect()
}

/// ScriptLine texts emitted for `script_id`.
pub fn lines_of(events: &[RunEvent], script_id: &str) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            RunEvent::ScriptLine { script_id: id, text } if id == script_id => Some(text.clone()),
            _ => None,
        })
        .collect()
}
