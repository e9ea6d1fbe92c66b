//! Executable descriptors and their resolution against discovered sources.

use std::path::{Path, PathBuf};

use crate::builder::errors::BuildError;
use crate::core::environment::Environment;
use crate::core::source_file::SourceFile;
use crate::util::fs::glob_files;

/// Name meaning "one executable per matching source file".
pub const WILDCARD_NAME: &str = "*";

pub const DEFAULT_ENTRY_POINT: &str = "src/main/cpp/*.c*";
pub const ALL_TARGETS: &str = "all";
pub const DEFAULT_RPATH: &str = "-rpath,$ORIGIN";

/// A declared executable, before its entry points are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableDescriptor {
    name: Option<String>,
    entry_point: String,
    targets: String,
    rpath: String,
}

impl ExecutableDescriptor {
    pub fn new(
        name: Option<String>,
        entry_point: Option<String>,
        targets: Option<String>,
        rpath: Option<String>,
    ) -> Self {
        ExecutableDescriptor {
            name,
            entry_point: entry_point.unwrap_or_else(|| DEFAULT_ENTRY_POINT.to_string()),
            targets: targets.unwrap_or_else(|| ALL_TARGETS.to_string()),
            rpath: rpath.unwrap_or_else(|| DEFAULT_RPATH.to_string()),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(Some(name.into()), None, None, None)
    }

    pub fn with_entry_point(mut self, pattern: impl Into<String>) -> Self {
        self.entry_point = pattern.into();
        self
    }

    pub fn with_targets(mut self, targets: impl Into<String>) -> Self {
        self.targets = targets.into();
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn targets(&self) -> &str {
        &self.targets
    }

    pub fn rpath(&self) -> &str {
        &self.rpath
    }

    /// Whether this executable is built for `env`.
    pub fn applies_to(&self, env: &Environment) -> bool {
        self.targets == ALL_TARGETS
            || self
                .targets
                .split(',')
                .any(|t| t.trim().eq_ignore_ascii_case(env.canonical_name()))
    }

    /// Source files named by the entry-point pattern.
    ///
    /// Each comma-separated element is taken literally if it names an
    /// existing file, otherwise as a glob relative to `base_dir`.
    pub fn matching_source_files(&self, base_dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
        let mut files = Vec::new();
        for element in self.entry_point.split(',').map(str::trim) {
            if element.is_empty() {
                continue;
            }
            let literal = base_dir.join(element);
            if literal.is_file() {
                files.push(literal);
            } else {
                files.extend(glob_files(base_dir, &[element])?);
            }
        }
        Ok(files)
    }

    /// Resolve against the full set of source records.
    ///
    /// Returns no executables (with a warning) when nothing matches. The
    /// wildcard name expands into one executable per matched file, named by
    /// the file's stem.
    pub fn resolve(
        &self,
        base_dir: &Path,
        all_files: &[SourceFile],
    ) -> Result<Vec<Executable>, BuildError> {
        let name = self.name.as_deref().ok_or_else(|| BuildError::InvalidExecutable {
            name: "<unnamed>".to_string(),
            reason: "mandatory parameter `name` has not been set".to_string(),
        })?;

        tracing::debug!(
            "Resolving files matching {} for executable {}",
            self.entry_point,
            name
        );

        let mut files = Vec::new();
        for raw in self.matching_source_files(base_dir)? {
            match all_files.iter().find(|f| same_file(f.source(), &raw)) {
                Some(file) => files.push(file.clone()),
                None => tracing::warn!(
                    "Could not find {} among the list of compiled files",
                    raw.display()
                ),
            }
        }

        if files.is_empty() {
            tracing::warn!(
                "Executable {} will be skipped, because no code files matching the entry point pattern \"{}\" could be found in {}",
                name,
                self.entry_point,
                base_dir.display()
            );
            return Ok(Vec::new());
        }

        if name == WILDCARD_NAME {
            return Ok(files
                .into_iter()
                .map(|file| Executable {
                    name: file.stem().to_string(),
                    descriptor: self.clone().with_entry_point(file.source().display().to_string()),
                    files: vec![file],
                })
                .collect());
        }

        Ok(vec![Executable {
            name: name.to_string(),
            descriptor: self.clone(),
            files,
        }])
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// An executable with its entry-point sources resolved.
#[derive(Debug, Clone)]
pub struct Executable {
    name: String,
    descriptor: ExecutableDescriptor,
    files: Vec<SourceFile>,
}

impl Executable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &ExecutableDescriptor {
        &self.descriptor
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Object files to link into this executable.
    pub fn objects(&self) -> Vec<&Path> {
        self.files.iter().map(SourceFile::object).collect()
    }

    pub fn applies_to(&self, env: &Environment) -> bool {
        self.descriptor.applies_to(env)
    }
}
