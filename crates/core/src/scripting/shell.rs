//! Linux scripts: run through a shell interpreter.
//!
//! The script path is passed as the interpreter's first argument. Scripts
//! uploaded without the owner-execute bit get it added before launch; the
//! content is never touched.

use std::path::Path;

use tokio::process::Command;

use super::executor::ScriptError;

/// Build `<program> <script_path>` after making sure the script is
/// executable by its owner.
pub async fn shell_command(program: &str, script_path: &Path) -> Result<Command, ScriptError> {
    ensure_owner_executable(script_path).await?;
    let mut cmd = Command::new(program);
    cmd.arg(script_path);
    Ok(cmd)
}

#[cfg(unix)]
async fn ensure_owner_executable(script_path: &Path) -> Result<(), ScriptError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = tokio::fs::metadata(script_path)
        .await
        .map_err(|_| ScriptError::NotFound(script_path.display().to_string()))?;

    let mut permissions = metadata.permissions();
    let mode = permissions.mode();
    if mode & 0o100 == 0 {
        permissions.set_mode(mode | 0o100);
        tokio::fs::set_permissions(script_path, permissions)
            .await
            .map_err(|e| ScriptError::PermissionDenied(format!("{}: {e}", script_path.display())))?;
        tracing::debug!(
            path = %script_path.display(),
            old_mode = %format_args!("{mode:#o}"),
            "Granted owner-execute permission"
        );
    }
    Ok(())
}

#[cfg(not(unix))]
async fn ensure_owner_executable(script_path: &Path) -> Result<(), ScriptError> {
    tokio::fs::metadata(script_path)
        .await
        .map(|_| ())
        .map_err(|_| ScriptError::NotFound(script_path.display().to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use assert_matches::assert_matches;

    use super::*;
    use crate::scripting::test_helpers::write_temp_script;

    #[tokio::test]
    async fn grants_owner_execute_when_missing() {
        let script = write_temp_script("echo hi\n");
        std::fs::set_permissions(script.path(), std::fs::Permissions::from_mode(0o644))
            .expect("chmod");

        shell_command("bash", script.path()).await.expect("build command");

        let mode = std::fs::metadata(script.path()).expect("stat").permissions().mode();
        assert_eq!(mode & 0o777, 0o744);
    }

    #[tokio::test]
    async fn leaves_executable_script_untouched() {
        let script = write_temp_script("echo hi\n");
        std::fs::set_permissions(script.path(), std::fs::Permissions::from_mode(0o750))
            .expect("chmod");

        shell_command("bash", script.path()).await.expect("build command");

        let mode = std::fs::metadata(script.path()).expect("stat").permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }

    #[tokio::test]
    async fn vanished_script_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = shell_command("bash", &dir.path().join("gone.sh")).await;
        assert_matches!(result, Err(ScriptError::NotFound(_)));
    }

    #[tokio::test]
    async fn passes_script_path_as_argument() {
        let script = write_temp_script("echo hi\n");
        let cmd = shell_command("bash", script.path()).await.expect("build command");

        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "bash");
        let args: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(args, vec![script.path().as_os_str()]);
    }
}
