//! Filesystem utilities.
//!
//! Engine-facing helpers return [`BuildError::Io`] so the failing path is
//! always part of the report.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use glob::glob;

use crate::builder::errors::BuildError;

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<(), BuildError> {
    if path.exists() {
        make_writable(path)?;
        fs::remove_dir_all(path).map_err(|e| BuildError::io(path, e))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<(), BuildError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| BuildError::io(path, e))?;
    }
    Ok(())
}

/// Modification time of a file, `None` if it does not exist.
pub fn modified(path: &Path) -> Result<Option<SystemTime>, BuildError> {
    match fs::metadata(path) {
        Ok(meta) => meta
            .modified()
            .map(Some)
            .map_err(|e| BuildError::io(path, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BuildError::io(path, e)),
    }
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).map_err(|e| BuildError::io(path, e))
}

/// Clear the read-only bit on every file below `path`.
fn make_writable(path: &Path) -> Result<(), BuildError> {
    for entry in walkdir::WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        let meta = entry
            .metadata()
            .map_err(|e| BuildError::io(entry.path(), io::Error::from(e)))?;
        let mut perms = meta.permissions();
        if perms.readonly() {
            #[allow(clippy::permissions_set_readonly_false)]
            perms.set_readonly(false);
            fs::set_permissions(entry.path(), perms).map_err(|e| BuildError::io(entry.path(), e))?;
        }
    }
    Ok(())
}

/// Mark a single file read-only.
pub fn set_read_only(path: &Path) -> Result<(), BuildError> {
    let mut perms = fs::metadata(path)
        .map_err(|e| BuildError::io(path, e))?
        .permissions();
    perms.set_readonly(true);
    fs::set_permissions(path, perms).map_err(|e| BuildError::io(path, e))
}

/// Find files matching glob patterns relative to a base directory.
///
/// Absolute patterns are used as-is.
pub fn glob_files(base: &Path, patterns: &[&str]) -> Result<Vec<PathBuf>, BuildError> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        let entries = glob(&pattern_str).map_err(|e| {
            BuildError::Config(format!("invalid glob pattern `{}`: {}", pattern, e))
        })?;

        for entry in entries {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        results.push(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}
