//! Runner interface and shared types.
//!
//! Defines [`ScriptLauncher`] and [`ScriptProcess`], the seam between the
//! execution coordinator and the operating system, along with
//! [`LaunchOptions`] and [`ScriptError`].

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::platform::Platform;

/// Per-launch options.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Wall-clock limit for the whole script. `None` means no limit.
    pub timeout: Option<Duration>,
    /// Triggered when the run is abandoned; the child is killed.
    pub cancel: CancellationToken,
}

/// Errors that can occur while launching or supervising a script.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// The script file was not found at launch time.
    #[error("Script not found: {0}")]
    NotFound(String),

    /// The script file could not be made executable.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The interpreter could not be started.
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The script exceeded its configured timeout and was killed.
    #[error("Script timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The run was cancelled while the script was running; it was killed.
    #[error("Script was cancelled")]
    Cancelled,

    /// Reading output from or waiting on a running process failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ScriptError {
    /// Whether this error concerns only the current script, so the run can
    /// move on to the next one.
    pub fn is_per_script(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::PermissionDenied(_) | Self::Launch { .. } | Self::Timeout { .. }
        )
    }
}

/// A running script.
///
/// Lines must be drained with [`next_line`](Self::next_line) until it
/// returns `Ok(None)`; only then is [`wait`](Self::wait) called for the exit
/// code.
pub trait ScriptProcess: Send {
    /// Next line of merged stdout/stderr, without its line terminator.
    fn next_line(&mut self) -> impl Future<Output = Result<Option<String>, ScriptError>> + Send;

    /// Wait for the process to exit and return its exit code (`-1` when
    /// killed by a signal).
    fn wait(self) -> impl Future<Output = Result<i32, ScriptError>> + Send;
}

/// Starts one script as a child process.
pub trait ScriptLauncher: Send + Sync {
    type Process: ScriptProcess;

    /// Launch the script at `script_path` for `platform`.
    fn launch(
        &self,
        platform: Platform,
        script_path: &Path,
        options: LaunchOptions,
    ) -> impl Future<Output = Result<Self::Process, ScriptError>> + Send;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_found() {
        let err = ScriptError::NotFound("/tmp/missing.sh".to_string());
        assert_eq!(err.to_string(), "Script not found: /tmp/missing.sh");
    }

    #[test]
    fn display_timeout() {
        let err = ScriptError::Timeout { elapsed_ms: 5000 };
        assert_eq!(err.to_string(), "Script timed out after 5000ms");
    }

    #[test]
    fn display_launch_includes_program() {
        let err = ScriptError::Launch {
            program: "powershell".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().starts_with("Failed to launch powershell"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn per_script_classification() {
        assert!(ScriptError::Timeout { elapsed_ms: 1 }.is_per_script());
        assert!(ScriptError::NotFound("x".into()).is_per_script());
        assert!(!ScriptError::Cancelled.is_per_script());
        assert!(!ScriptError::IoError(std::io::Error::other("boom")).is_per_script());
    }
}
