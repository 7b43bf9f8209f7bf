use std::path::PathBuf;
use std::time::Duration;

use sysaudit_core::scripting::launcher::{DEFAULT_POWERSHELL_PROGRAM, DEFAULT_SHELL_PROGRAM};

/// A configuration variable holds a value that cannot be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for running next to the script
/// directory on a workstation.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `127.0.0.1`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// Time allowed to produce a response head, in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Root holding `scripts.json` and one directory per platform.
    pub scripts_dir: PathBuf,
    /// Where reports are written and served from.
    pub reports_dir: PathBuf,
    /// Per-script wall-clock limit in seconds; `None` disables it.
    pub script_timeout_secs: Option<u64>,
    /// Interpreter for Linux scripts.
    pub shell_program: String,
    /// Scripting host for Windows scripts.
    pub powershell_program: String,
    /// Optional file receiving a copy of the log output.
    pub log_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `HOST`                 | `127.0.0.1`             |
    /// | `PORT`                 | `5000`                  |
    /// | `CORS_ORIGINS`         | `http://localhost:5000` |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                    |
    /// | `SCRIPTS_DIR`          | `audit_scripts`         |
    /// | `REPORTS_DIR`          | `reports`               |
    /// | `SCRIPT_TIMEOUT_SECS`  | unset (no limit)        |
    /// | `SHELL_PROGRAM`        | `bash`                  |
    /// | `POWERSHELL_PROGRAM`   | `powershell`            |
    /// | `LOG_FILE`             | unset                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".into());
        let port = parse_or("PORT", var("PORT"), 5000u16)?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_or("REQUEST_TIMEOUT_SECS", var("REQUEST_TIMEOUT_SECS"), 30u64)?;

        let script_timeout_secs = match var("SCRIPT_TIMEOUT_SECS") {
            Some(raw) => Some(parse::<u64>("SCRIPT_TIMEOUT_SECS", raw)?).filter(|secs| *secs > 0),
            None => None,
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            scripts_dir: var("SCRIPTS_DIR").unwrap_or_else(|| "audit_scripts".into()).into(),
            reports_dir: var("REPORTS_DIR").unwrap_or_else(|| "reports".into()).into(),
            script_timeout_secs,
            shell_program: var("SHELL_PROGRAM").unwrap_or_else(|| DEFAULT_SHELL_PROGRAM.into()),
            powershell_program: var("POWERSHELL_PROGRAM")
                .unwrap_or_else(|| DEFAULT_POWERSHELL_PROGRAM.into()),
            log_file: var("LOG_FILE").map(PathBuf::from),
        })
    }

    pub fn script_timeout(&self) -> Option<Duration> {
        self.script_timeout_secs.map(Duration::from_secs)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value: raw })
}

fn parse_or<T: std::str::FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => parse(var, raw),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5000);
        assert_eq!(config.cors_origins, vec!["http://localhost:5000"]);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.scripts_dir, PathBuf::from("audit_scripts"));
        assert_eq!(config.reports_dir, PathBuf::from("reports"));
        assert_eq!(config.script_timeout(), None);
        assert_eq!(config.shell_program, "bash");
        assert_eq!(config.powershell_program, "powershell");
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("SCRIPT_TIMEOUT_SECS", "120"),
            ("LOG_FILE", "audit.log"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.script_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.log_file, Some(PathBuf::from("audit.log")));
    }

    #[test]
    fn zero_script_timeout_disables_it() {
        let config = load(&[("SCRIPT_TIMEOUT_SECS", "0")]).unwrap();
        assert_eq!(config.script_timeout(), None);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert_matches!(
            load(&[("PORT", "http")]),
            Err(ConfigError::Invalid { var: "PORT", ref value }) if value == "http"
        );
        assert_matches!(
            load(&[("SCRIPT_TIMEOUT_SECS", "-1")]),
            Err(ConfigError::Invalid { var: "SCRIPT_TIMEOUT_SECS", .. })
        );
    }
}
