//! Windows scripts: run through the PowerShell scripting host.
//!
//! `-ExecutionPolicy Bypass` applies to this one invocation only; the
//! machine or user policy is left alone.

use std::path::Path;

use tokio::process::Command;

use super::executor::ScriptError;

/// Build `<program> -NoProfile -NonInteractive -ExecutionPolicy Bypass -File <script_path>`.
pub async fn powershell_command(program: &str, script_path: &Path) -> Result<Command, ScriptError> {
    tokio::fs::metadata(script_path)
        .await
        .map_err(|_| ScriptError::NotFound(script_path.display().to_string()))?;

    let mut cmd = Command::new(program);
    cmd.args(["-NoProfile", "-NonInteractive", "-ExecutionPolicy", "Bypass", "-File"])
        .arg(script_path);
    Ok(cmd)
}
