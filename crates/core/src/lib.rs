//! Domain building blocks for the system audit service.
//!
//! Everything here is transport-agnostic: the script registry snapshot,
//! path containment checks, the process runner, run results, and the
//! report writer. The HTTP layer and the execution coordinator live in
//! their own crates and compose these pieces.

pub mod error;
pub mod paths;
pub mod platform;
pub mod registry;
pub mod report;
pub mod results;
pub mod scripting;

pub use error::CoreError;
pub use platform::Platform;
pub use registry::{RegistryStore, ResolvedScript, ScriptMetadata, ScriptRegistry, ValidationError};
pub use report::{PdfReportWriter, ReportWriter};
pub use results::RunResult;
