//! Script registry: the `scripts.json` metadata file next to the platform
//! script directories.
//!
//! The file maps platform name to `{ filename -> { title, description } }`.
//! It is owned by the administrative surface (upload/edit/delete), so this
//! module only ever reads it, taking one [`ScriptRegistry`] snapshot per run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::paths;
use crate::platform::Platform;

/// Name of the registry file inside the scripts root.
pub const REGISTRY_FILE: &str = "scripts.json";

/// One registry entry as stored in `scripts.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Read-only metadata for a registered script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptMetadata {
    /// Filename-derived identifier, unique within a platform.
    pub id: String,
    /// Display title; falls back to `id` when the registry has none.
    pub title: String,
    pub description: String,
    pub platform: Platform,
}

/// A script that passed every validation check and may be launched.
#[derive(Debug, Clone)]
pub struct ResolvedScript {
    pub metadata: ScriptMetadata,
    /// Canonical absolute path, guaranteed to lie in the platform directory
    /// at the time of resolution.
    pub path: PathBuf,
}

/// Reasons a requested script id is rejected before launch.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{id} is not registered for {platform}")]
    UnknownScript { platform: Platform, id: String },

    #[error("script file {} does not exist", .path.display())]
    MissingFile { path: PathBuf },

    #[error("script path {} resolves outside the {platform} script directory", .path.display())]
    OutsideScriptDir { platform: Platform, path: PathBuf },
}

impl ValidationError {
    /// Reason shown to the caller.
    ///
    /// All three causes read the same so that probing for files outside the
    /// script directory reveals nothing beyond "not found".
    pub fn reason(&self) -> &'static str {
        "not found"
    }
}

/// Errors reading or writing `scripts.json`.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed registry file {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Immutable snapshot of `scripts.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptRegistry {
    platforms: BTreeMap<String, IndexMap<String, ScriptEntry>>,
}

impl ScriptRegistry {
    /// Parse a registry from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Register (or replace) an entry. Used when seeding registries.
    pub fn insert(&mut self, platform: Platform, id: impl Into<String>, entry: ScriptEntry) {
        self.platforms
            .entry(platform.as_str().to_string())
            .or_default()
            .insert(id.into(), entry);
    }

    /// All entries registered for `platform`, in file order.
    pub fn scripts(&self, platform: Platform) -> Vec<ScriptMetadata> {
        self.platforms
            .get(platform.as_str())
            .map(|entries| {
                entries
                    .iter()
                    .map(|(id, entry)| to_metadata(platform, id, entry))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Metadata for one script, if registered under `platform`.
    pub fn get(&self, platform: Platform, id: &str) -> Option<ScriptMetadata> {
        self.platforms
            .get(platform.as_str())
            .and_then(|entries| entries.get(id))
            .map(|entry| to_metadata(platform, id, entry))
    }

    /// Validate a requested script id and resolve its on-disk location.
    ///
    /// The id must be registered under `platform`, the file
    /// `<scripts_root>/<platform>/<id>` must exist, and its canonical path
    /// must lie inside the canonical platform directory.
    pub fn resolve(
        &self,
        scripts_root: &Path,
        platform: Platform,
        id: &str,
    ) -> Result<ResolvedScript, ValidationError> {
        let metadata = self
            .get(platform, id)
            .ok_or_else(|| ValidationError::UnknownScript {
                platform,
                id: id.to_string(),
            })?;

        let platform_dir = scripts_root.join(platform.as_str());
        let candidate = platform_dir.join(id);
        if !candidate.exists() {
            return Err(ValidationError::MissingFile { path: candidate });
        }

        let path = paths::resolve_within(&platform_dir, &candidate).map_err(|err| match err {
            CoreError::Forbidden(_) => ValidationError::OutsideScriptDir {
                platform,
                path: candidate.clone(),
            },
            _ => ValidationError::MissingFile {
                path: candidate.clone(),
            },
        })?;

        Ok(ResolvedScript { metadata, path })
    }
}

fn to_metadata(platform: Platform, id: &str, entry: &ScriptEntry) -> ScriptMetadata {
    let title = if entry.title.trim().is_empty() {
        id.to_string()
    } else {
        entry.title.clone()
    };
    ScriptMetadata {
        id: id.to_string(),
        title,
        description: entry.description.clone(),
        platform,
    }
}

/// Location of `scripts.json` and the entry point for taking snapshots.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    /// Store for the registry file inside `scripts_root`.
    pub fn new(scripts_root: impl AsRef<Path>) -> Self {
        Self {
            path: scripts_root.as_ref().join(REGISTRY_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strictly load the registry file.
    pub fn load(&self) -> Result<ScriptRegistry, RegistryError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| RegistryError::Io {
            path: self.path.clone(),
            source,
        })?;
        ScriptRegistry::from_json(&text).map_err(|source| RegistryError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    /// Write `registry` to the registry file, pretty-printed.
    pub fn save(&self, registry: &ScriptRegistry) -> Result<(), RegistryError> {
        let io_err = |source: std::io::Error| RegistryError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(registry).map_err(|source| {
            RegistryError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, text).map_err(io_err)
    }

    /// Take a snapshot for one run. Never fails.
    ///
    /// A missing file is replaced by an empty registry on disk; an unreadable
    /// or malformed file is logged and treated as empty.
    pub fn snapshot(&self) -> ScriptRegistry {
        match self.load() {
            Ok(registry) => registry,
            Err(RegistryError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::warn!(path = %self.path.display(), "Registry file not found, creating an empty one");
                let empty = ScriptRegistry::default();
                if let Err(e) = self.save(&empty) {
                    tracing::error!(error = %e, "Failed to create empty registry file");
                }
                empty
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load script registry");
                ScriptRegistry::default()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
