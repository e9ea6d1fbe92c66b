//! Dependency record parsing.
//!
//! GCC's `-MMD` writes a make-style rule per object:
//!
//! ```text
//! main.o: main.cpp include/foo.h \
//!  include/bar.h
//! ```
//!
//! The analyzer turns that into the list of headers the object depends on.

use std::path::{Path, PathBuf};

use crate::builder::errors::BuildError;
use crate::core::source_file::SourceFile;

/// Raw header tokens from a dependency record, with the rule target, the
/// source itself and line continuations removed.
pub fn parse_dependency_record(contents: &str, file: &SourceFile) -> Vec<String> {
    let source_name = file.file_name().to_string_lossy();
    let source_path = file.source().to_string_lossy();
    let object_name = file
        .object()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let object_path = file.object().to_string_lossy();

    contents
        .split_whitespace()
        .filter(|token| !token.starts_with('\\'))
        .filter(|token| *token != ":")
        .filter(|token| *token != source_name && *token != source_path)
        .filter(|token| match token.strip_suffix(':') {
            Some(target) => target != object_name && target != object_path,
            None => true,
        })
        .map(str::to_string)
        .collect()
}

/// Headers listed in the dependency record of `file`, resolved on disk.
///
/// A listed path is tried as given first, then relative to the source
/// directory. A path that resolves to neither is an error: the record is
/// stale or corrupt.
pub fn included_files(file: &SourceFile) -> Result<Vec<PathBuf>, BuildError> {
    let record = file.dependency();
    let contents = std::fs::read_to_string(record).map_err(|e| BuildError::io(record, e))?;

    parse_dependency_record(&contents, file)
        .into_iter()
        .map(|token| resolve_include(record, file.source_dir(), &token))
        .collect()
}

fn resolve_include(record: &Path, source_dir: &Path, token: &str) -> Result<PathBuf, BuildError> {
    let direct = PathBuf::from(token);
    if direct.exists() {
        return Ok(direct);
    }

    let relative = source_dir.join(token);
    if relative.exists() {
        return Ok(relative);
    }

    Err(BuildError::UnresolvedInclude {
        record: record.to_path_buf(),
        path: token.to_string(),
        absolute: std::path::absolute(&direct).unwrap_or(direct),
        relative,
    })
}
