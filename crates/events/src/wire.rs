//! Marker tokens embedded in event payloads.
//!
//! Payloads are free-form text lines; consumers recognise the terminal
//! events by these prefixes.

/// Prefix of the successful-completion payload, followed by the report path.
pub const REPORT_PATH_MARKER: &str = "REPORT_PATH::";

/// Prefix of every failure payload.
pub const FAILURE_MARKER: &str = "❌ ";

/// Prefix of a non-zero exit warning.
pub const WARNING_MARKER: &str = "⚠️ ";

/// Reason shown for a script rejected by validation.
pub const NOT_FOUND_REASON: &str = "not found";

pub const RUN_STARTED: &str = "Starting Audit...";
pub const GENERATING_REPORT: &str = "Generating PDF report...";
pub const RUN_COMPLETED: &str = "Audit completed.";
pub const REPORT_FAILED: &str = "Report generation failed.";

/// Banner announcing the next script.
pub fn running_banner(title: &str, script_id: &str) -> String {
    format!("--- Running: {title} ({script_id}) ---")
}

/// Reason text for an unexpected fault that ends the run.
pub fn critical_error(detail: impl std::fmt::Display) -> String {
    format!("A critical error occurred: {detail}")
}
