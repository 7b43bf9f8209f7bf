//! Target platforms an audit script can be written for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Operating system family a script targets.
///
/// The canonical spelling (`Linux`, `Windows`) is used both as the key in
/// `scripts.json` and as the sub-directory name under the scripts root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Linux,
    Windows,
}

impl Platform {
    /// Canonical name, also the directory name under the scripts root.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::Windows => "Windows",
        }
    }

    /// Platform of the machine this process runs on, if supported.
    pub fn detect() -> Option<Self> {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Map an OS name as reported by the standard library (`linux`,
    /// `windows`, ...) onto a supported platform.
    pub fn from_os_name(os: &str) -> Option<Self> {
        let os = os.to_ascii_lowercase();
        if os.contains("windows") {
            Some(Self::Windows)
        } else if os.contains("linux") {
            Some(Self::Linux)
        } else {
            None
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            other => Err(CoreError::Validation(format!("Unsupported platform: {other}"))),
        }
    }
}
