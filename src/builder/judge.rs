//! Staleness decisions for individual source files.

use std::time::SystemTime;

use crate::builder::errors::BuildError;
use crate::builder::includes::included_files;
use crate::core::source_file::SourceFile;
use crate::util::fs::modified;

/// Decides whether a source file must be compiled again.
pub trait RecompilationJudge: Send + Sync {
    fn needs_compilation(&self, file: &SourceFile) -> Result<bool, BuildError>;
}

/// Judge for toolchains that emit make-style dependency records.
///
/// A file is stale when, checked in order:
/// 1. its object file is missing
/// 2. its dependency record is missing
/// 3. the source is newer than the object
/// 4. any header listed in the record is newer than the object
#[derive(Debug, Default, Clone, Copy)]
pub struct GccRecompilationJudge;

impl RecompilationJudge for GccRecompilationJudge {
    fn needs_compilation(&self, file: &SourceFile) -> Result<bool, BuildError> {
        let Some(object_time) = modified(file.object())? else {
            tracing::debug!("{} has no object file", file);
            return Ok(true);
        };

        if !file.dependency().exists() {
            tracing::debug!("{} has no dependency record", file);
            return Ok(true);
        }

        if is_newer(file.source(), object_time)? {
            tracing::debug!("{} is newer than its object file", file);
            return Ok(true);
        }

        for header in included_files(file)? {
            if is_newer(&header, object_time)? {
                tracing::debug!("{} includes {}, which has changed", file, header.display());
                return Ok(true);
            }
        }

        Ok(false)
    }
}

fn is_newer(path: &std::path::Path, reference: SystemTime) -> Result<bool, BuildError> {
    Ok(modified(path)?.is_some_and(|t| t > reference))
}
