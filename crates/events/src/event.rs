//! The [`RunEvent`] variant type.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::wire;

/// One unit of progress pushed to the consumer of a run.
///
/// The [`Display`](fmt::Display) impl renders the textual payload that goes
/// on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// Status line not tied to a particular script.
    Info { text: String },

    /// One captured output line of a script.
    ScriptLine { script_id: String, text: String },

    /// A script finished with a non-zero exit status.
    ScriptWarning { script_id: String, exit_code: i32 },

    /// The report was written. Terminal.
    ReportReady { path: PathBuf },

    /// Something went wrong. With a `script_id` the failure is confined to
    /// that script and the run continues; without one it ends the run.
    Failure {
        script_id: Option<String>,
        reason: String,
    },
}

impl RunEvent {
    pub fn info(text: impl Into<String>) -> Self {
        Self::Info { text: text.into() }
    }

    pub fn line(script_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::ScriptLine {
            script_id: script_id.into(),
            text: text.into(),
        }
    }

    pub fn warning(script_id: impl Into<String>, exit_code: i32) -> Self {
        Self::ScriptWarning {
            script_id: script_id.into(),
            exit_code,
        }
    }

    pub fn report_ready(path: impl AsRef<Path>) -> Self {
        Self::ReportReady {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Failure confined to one script.
    pub fn script_failure(script_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failure {
            script_id: Some(script_id.into()),
            reason: reason.into(),
        }
    }

    /// Failure that ends the run.
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Failure {
            script_id: None,
            reason: reason.into(),
        }
    }

    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ReportReady { .. } | Self::Failure { script_id: None, .. }
        )
    }

    /// Script the event belongs to, if any.
    pub fn script_id(&self) -> Option<&str> {
        match self {
            Self::ScriptLine { script_id, .. } | Self::ScriptWarning { script_id, .. } => {
                Some(script_id)
            }
            Self::Failure { script_id, .. } => script_id.as_deref(),
            Self::Info { .. } | Self::ReportReady { .. } => None,
        }
    }
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info { text } | Self::ScriptLine { text, .. } => f.write_str(text),
            Self::ScriptWarning { exit_code, .. } => {
                write!(f, "{}Script exited with code {exit_code}", wire::WARNING_MARKER)
            }
            Self::ReportReady { path } => {
                write!(f, "{}{}", wire::REPORT_PATH_MARKER, path.display())
            }
            Self::Failure {
                script_id: Some(id),
                reason,
            } => write!(f, "{}{id}: {reason}", wire::FAILURE_MARKER),
            Self::Failure {
                script_id: None,
                reason,
            } => write!(f, "{}{reason}", wire::FAILURE_MARKER),
        }
    }
}
