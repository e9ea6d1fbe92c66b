//! Build directory currency.
//!
//! A build directory produced from an older manifest is thrown away before
//! building, since any setting may have changed.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::builder::errors::BuildError;
use crate::util::fs::{modified, remove_dir_all_if_exists, write_string};

/// Stamp file whose modification time records the last completed build.
pub const STAMP_NAME: &str = ".anvil-stamp";

fn stamp(build_dir: &Path) -> PathBuf {
    build_dir.join(STAMP_NAME)
}

/// Delete `build_dir` if `manifest` changed after it was last built.
/// Returns whether the directory was deleted.
pub fn ensure_current(manifest: Option<&Path>, build_dir: &Path) -> Result<bool, BuildError> {
    let Some(manifest) = manifest else {
        return Ok(false);
    };
    if !build_dir.exists() {
        return Ok(false);
    }

    let built = match modified(&stamp(build_dir))? {
        Some(time) => Some(time),
        None => modified(build_dir)?,
    };
    match (modified(manifest)?, built) {
        (Some(changed), Some(built)) if changed > built => {
            tracing::info!(
                "{} changed since the last build, removing {}",
                manifest.display(),
                build_dir.display()
            );
            remove_dir_all_if_exists(build_dir)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Record that `build_dir` is current as of now.
pub fn mark_current(build_dir: &Path) -> Result<(), BuildError> {
    let path = stamp(build_dir);
    if !path.exists() {
        write_string(&path, "")?;
    }
    File::options()
        .write(true)
        .open(&path)
        .and_then(|f| f.set_modified(SystemTime::now()))
        .map_err(|e| BuildError::io(&path, e))
}
