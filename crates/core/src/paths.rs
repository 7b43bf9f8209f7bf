//! Path containment checks.
//!
//! Both the scripts directory and the reports directory are only ever
//! accessed through [`resolve_within`], which canonicalizes the candidate
//! (following symlinks and `..` segments) before comparing it against the
//! canonical base directory.

use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Resolve `candidate` to its canonical absolute form and require that it
/// lies inside `base`.
///
/// Returns [`CoreError::NotFound`] when either path does not exist and
/// [`CoreError::Forbidden`] when the resolved candidate escapes `base`.
pub fn resolve_within(base: &Path, candidate: &Path) -> Result<PathBuf, CoreError> {
    let base = base.canonicalize().map_err(|_| CoreError::NotFound {
        entity: "Directory",
        id: base.display().to_string(),
    })?;
    let resolved = candidate.canonicalize().map_err(|_| CoreError::NotFound {
        entity: "File",
        id: candidate.display().to_string(),
    })?;

    if resolved.starts_with(&base) && resolved != base {
        Ok(resolved)
    } else {
        Err(CoreError::Forbidden(format!(
            "{} is outside {}",
            resolved.display(),
            base.display()
        )))
    }
}
