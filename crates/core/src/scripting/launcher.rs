//! Platform dispatch for launching audit scripts on the local machine.

use std::path::Path;

use super::executor::{LaunchOptions, ScriptError, ScriptLauncher};
use super::powershell::powershell_command;
use super::shell::shell_command;
use super::subprocess::{self, RunningScript};
use crate::platform::Platform;

/// Default interpreter for Linux scripts.
pub const DEFAULT_SHELL_PROGRAM: &str = "bash";

/// Default scripting host for Windows scripts.
pub const DEFAULT_POWERSHELL_PROGRAM: &str = "powershell";

/// Launches scripts as local child processes.
#[derive(Debug, Clone)]
pub struct SystemLauncher {
    shell_program: String,
    powershell_program: String,
}

impl SystemLauncher {
    pub fn new(shell_program: impl Into<String>, powershell_program: impl Into<String>) -> Self {
        Self {
            shell_program: shell_program.into(),
            powershell_program: powershell_program.into(),
        }
    }
}

impl Default for SystemLauncher {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL_PROGRAM, DEFAULT_POWERSHELL_PROGRAM)
    }
}

impl ScriptLauncher for SystemLauncher {
    type Process = RunningScript;

    async fn launch(
        &self,
        platform: Platform,
        script_path: &Path,
        options: LaunchOptions,
    ) -> Result<RunningScript, ScriptError> {
        let cmd = match platform {
            Platform::Linux => shell_command(&self.shell_program, script_path).await?,
            Platform::Windows => powershell_command(&self.powershell_program, script_path).await?,
        };
        tracing::debug!(%platform, path = %script_path.display(), "Launching script");
        subprocess::spawn(cmd, options)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::scripting::executor::ScriptProcess;
    use crate::scripting::test_helpers::write_temp_script;

    #[tokio::test]
    async fn runs_linux_script_through_shell() {
        let script = write_temp_script("echo \"hello from $0\"\nexit 2\n");
        let mut process = SystemLauncher::default()
            .launch(Platform::Linux, script.path(), LaunchOptions::default())
            .await
            .expect("launch");

        let line = process.next_line().await.expect("read").expect("one line");
        assert!(line.starts_with("hello from"));
        assert_eq!(process.next_line().await.expect("read"), None);
        assert_eq!(process.wait().await.expect("wait"), 2);
    }

    #[tokio::test]
    async fn missing_scripting_host_is_a_launch_error() {
        let script = write_temp_script("Write-Output hi\n");
        let launcher = SystemLauncher::new("bash", "no-such-powershell-host-81c2");

        let result = launcher
            .launch(Platform::Windows, script.path(), LaunchOptions::default())
            .await;
        assert_matches!(result, Err(ScriptError::Launch { .. }));
    }
}
