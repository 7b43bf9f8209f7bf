//! Process runner for audit scripts.
//!
//! A [`ScriptLauncher`](executor::ScriptLauncher) starts one child process
//! per script and hands back a [`ScriptProcess`](executor::ScriptProcess)
//! that yields the merged stdout/stderr line by line and finally the exit
//! code. Platform dispatch (bash vs. PowerShell) lives in
//! [`launcher::SystemLauncher`].

pub mod executor;
pub mod launcher;
pub mod powershell;
pub mod shell;
pub mod subprocess;

pub use executor::{LaunchOptions, ScriptError, ScriptLauncher, ScriptProcess};
pub use launcher::SystemLauncher;
