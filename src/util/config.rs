//! Project configuration (`Anvil.toml`).
//!
//! The manifest carries everything the engine needs as already-resolved
//! input: project identity, target list, per-environment arguments,
//! executable descriptors and the resolved dependency artifacts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::artifact::{DependencyArtifact, Scope};
use crate::core::executable::ExecutableDescriptor;

/// Default manifest file name.
pub const MANIFEST_NAME: &str = "Anvil.toml";

/// Contents of `Anvil.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    pub project: ProjectConfig,

    pub build: BuildOptions,

    /// Source root overrides keyed by `all` or an environment name.
    pub sources: BTreeMap<String, String>,

    pub compiler_arguments: BTreeMap<String, String>,

    pub linker_arguments: BTreeMap<String, String>,

    #[serde(rename = "executable")]
    pub executables: Vec<ExecutableConfig>,

    #[serde(rename = "dependency")]
    pub dependencies: Vec<DependencyConfig>,

    /// Path of the manifest this was loaded from.
    #[serde(skip)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProjectConfig {
    pub name: String,
    pub version: String,

    /// Project base directory; relative paths resolve against the manifest.
    pub base_dir: Option<PathBuf>,

    /// Build output directory, relative to the base directory.
    pub build_dir: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            name: String::new(),
            version: "0.0.0".to_string(),
            base_dir: None,
            build_dir: PathBuf::from("target"),
        }
    }
}

/// Build-wide switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildOptions {
    /// Target environment names. Empty means "the host".
    pub targets: Vec<String>,

    /// Host environment name. Auto-detected when absent.
    pub host: Option<String>,

    /// Number of compile workers.
    pub jobs: Option<usize>,

    /// Link a shared library per target.
    pub shared: bool,

    /// Build independent targets concurrently.
    pub parallel_targets: bool,

    /// Fail instead of warning when two providers claim the same combination.
    pub strict_providers: bool,

    /// Build the test sources instead of the main ones.
    pub test: bool,
}

/// One `[[executable]]` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExecutableConfig {
    pub name: Option<String>,
    pub entry_point: Option<String>,
    pub targets: Option<String>,
    pub rpath: Option<String>,
}

/// One `[[dependency]]` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DependencyConfig {
    pub group: String,
    pub name: String,
    pub version: String,
    pub classifier: Option<String>,
    pub scope: Scope,
    pub snapshot: Option<bool>,
    pub file: PathBuf,
}

impl BuildConfig {
    /// Load configuration from a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        let mut config: BuildConfig = toml::from_str(&contents)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))?;
        // Tools run in other working directories; derived paths stay absolute.
        let manifest_path = std::path::absolute(path)
            .with_context(|| format!("failed to resolve manifest path: {}", path.display()))?;
        config.manifest_path = Some(manifest_path);

        if config.project.name.is_empty() {
            anyhow::bail!("manifest {} has no `project.name`", path.display());
        }

        Ok(config)
    }

    /// Directory the project lives in.
    pub fn base_dir(&self) -> PathBuf {
        let manifest_dir = self
            .manifest_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        match &self.project.base_dir {
            Some(dir) => manifest_dir.join(dir),
            None => manifest_dir,
        }
    }

    /// Directory build outputs go to.
    pub fn build_dir(&self) -> PathBuf {
        self.base_dir().join(&self.project.build_dir)
    }

    /// Executable descriptors with defaults applied.
    pub fn executable_descriptors(&self) -> Vec<ExecutableDescriptor> {
        self.executables
            .iter()
            .map(|e| {
                ExecutableDescriptor::new(
                    e.name.clone(),
                    e.entry_point.clone(),
                    e.targets.clone(),
                    e.rpath.clone(),
                )
            })
            .collect()
    }

    /// Dependency artifacts as the engine sees them.
    pub fn artifacts(&self) -> Vec<DependencyArtifact> {
        let base = self.base_dir();
        self.dependencies
            .iter()
            .map(|d| {
                let mut artifact = DependencyArtifact::new(
                    &d.group,
                    &d.name,
                    &d.version,
                    d.scope,
                    base.join(&d.file),
                );
                if let Some(classifier) = &d.classifier {
                    artifact = artifact.with_classifier(classifier);
                }
                if let Some(snapshot) = d.snapshot {
                    artifact = artifact.with_snapshot(snapshot);
                }
                artifact
            })
            .collect()
    }
}
