//! Execution coordinator for audit runs.
//!
//! [`AuditCoordinator`] validates each requested script against a registry
//! snapshot, runs the scripts one after another through a
//! [`ScriptLauncher`](sysaudit_core::scripting::ScriptLauncher), streams
//! every line as a [`RunEvent`](sysaudit_events::RunEvent) and finally hands
//! the collected output to a [`ReportWriter`](sysaudit_core::ReportWriter).

pub mod coordinator;

pub use coordinator::{AuditCoordinator, CoordinatorConfig, RunError, RunRequest};
