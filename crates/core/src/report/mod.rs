//! Report generation.
//!
//! The coordinator only knows the [`ReportWriter`] interface; the default
//! implementation lays out a PDF and serialises it with `printpdf`.

pub mod writer;

use std::path::PathBuf;

use crate::platform::Platform;
use crate::results::RunResult;

pub use writer::PdfReportWriter;

/// Turns the captured output of a run into a persisted artifact.
///
/// Implementations must not fail across this boundary: any internal fault
/// is logged and reported as `None`. Text that the artifact format cannot
/// represent is substituted, never rejected.
pub trait ReportWriter: Send + Sync {
    /// Persist a report and return its location.
    fn generate(&self, platform: Platform, results: &RunResult) -> Option<PathBuf>;
}
