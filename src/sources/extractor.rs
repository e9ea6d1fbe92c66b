//! Lazy extraction of dependency bundles.
//!
//! A bundle is a zip file whose entries are grouped under `noarch/` and one
//! directory per environment. Each (artifact, slice) pair is extracted at
//! most once per process, into a directory carrying a `version` marker.
//! Existing extractions are reused unless the marker disagrees with the
//! artifact version or a snapshot bundle is newer than the extraction.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::builder::errors::BuildError;
use crate::core::artifact::DependencyArtifact;
use crate::core::environment::Environment;
use crate::util::fs::{ensure_dir, modified, remove_dir_all_if_exists, set_read_only, write_string};
use crate::util::layout::BuildLayout;

use super::identifier::DependencyIdentifier;

/// Name of the marker file recording the extracted version.
pub const VERSION_MARKER: &str = "version";

/// Makes dependency bundles available on disk.
///
/// Shared by every target of a build; securing runs under one lock so
/// targets built in parallel never extract the same slice twice.
pub struct DependencyExtractor {
    layout: BuildLayout,
    secured: Mutex<HashSet<DependencyIdentifier>>,
}

impl DependencyExtractor {
    pub fn new(layout: BuildLayout) -> Self {
        DependencyExtractor {
            layout,
            secured: Mutex::new(HashSet::new()),
        }
    }

    /// Secure the `noarch` and `target` slices of every artifact.
    pub fn extract_all(
        &self,
        artifacts: &[DependencyArtifact],
        target: &Environment,
    ) -> Result<(), BuildError> {
        for artifact in artifacts {
            self.secure(&DependencyIdentifier::noarch(artifact))?;
            self.secure(&DependencyIdentifier::for_environment(artifact, target))?;
        }
        Ok(())
    }

    /// Make one slice available. Returns whether anything was extracted.
    pub fn secure(&self, id: &DependencyIdentifier) -> Result<bool, BuildError> {
        let mut secured = self.secured.lock().unwrap_or_else(PoisonError::into_inner);
        if secured.contains(id) {
            return Ok(false);
        }

        let artifact = id.artifact();
        if !artifact.file().is_file() {
            return Err(BuildError::MissingArtifact {
                artifact: artifact.to_string(),
                path: artifact.file().to_path_buf(),
            });
        }

        let dest = id.destination(&self.layout);
        if dest.exists() && !self.is_valid(artifact, &dest)? {
            tracing::debug!("Discarding stale extraction of {} at {}", artifact, dest.display());
            remove_dir_all_if_exists(&dest)?;
        }
        if !dest.exists() {
            ensure_dir(&dest)?;
            write_string(&dest.join(VERSION_MARKER), artifact.version())?;
        }

        let slice = dest.join(id.discriminator());
        let extracted = if slice.exists() {
            false
        } else {
            self.extract(id, &dest)?;
            true
        };

        secured.insert(id.clone());
        Ok(extracted)
    }

    fn is_valid(&self, artifact: &DependencyArtifact, dest: &Path) -> Result<bool, BuildError> {
        if artifact.is_snapshot() {
            if let (Some(bundle), Some(extracted)) = (modified(artifact.file())?, modified(dest)?) {
                if bundle > extracted {
                    tracing::debug!("Snapshot {} is newer than its extraction", artifact);
                    return Ok(false);
                }
            }
        }

        let marker = dest.join(VERSION_MARKER);
        match fs::read_to_string(&marker) {
            Ok(version) if version.trim() == artifact.version() => Ok(true),
            Ok(version) => {
                tracing::debug!(
                    "Extraction of {} is version {}, expected {}",
                    artifact,
                    version.trim(),
                    artifact.version()
                );
                Ok(false)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BuildError::io(&marker, e)),
        }
    }

    fn extract(&self, id: &DependencyIdentifier, dest: &Path) -> Result<(), BuildError> {
        let artifact = id.artifact();
        let zip_error = |source| BuildError::Extraction {
            artifact: artifact.to_string(),
            source,
        };

        let file = File::open(artifact.file()).map_err(|e| BuildError::io(artifact.file(), e))?;
        let mut archive = zip::ZipArchive::new(file).map_err(zip_error)?;
        let prefix = id.entry_prefix();
        let mut count = 0;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(zip_error)?;
            if !entry.name().starts_with(&prefix) {
                continue;
            }
            let Some(relative) = entry.enclosed_name() else {
                tracing::warn!(
                    "Skipping entry {} of {}: it would escape {}",
                    entry.name(),
                    artifact,
                    dest.display()
                );
                continue;
            };
            let output = dest.join(relative);

            if entry.name().ends_with('/') {
                ensure_dir(&output)?;
                continue;
            }
            if let Some(parent) = output.parent() {
                ensure_dir(parent)?;
            }
            let mut out = File::create(&output).map_err(|e| BuildError::io(&output, e))?;
            io::copy(&mut entry, &mut out).map_err(|e| BuildError::io(&output, e))?;
            drop(out);
            set_read_only(&output)?;
            count += 1;
        }

        // An empty slice still counts as extracted.
        ensure_dir(&dest.join(id.discriminator()))?;
        tracing::debug!("Extracted {} files of {} to {}", count, id, dest.display());
        Ok(())
    }
}
