//! Resolved upstream dependency artifacts.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Which build a dependency is visible to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Compile,
    Test,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Compile => "compile",
            Scope::Test => "test",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An already-resolved dependency: coordinates plus the zip file backing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyArtifact {
    group: String,
    name: String,
    version: String,
    classifier: Option<String>,
    scope: Scope,
    snapshot: bool,
    file: PathBuf,
}

impl DependencyArtifact {
    /// Snapshot-ness is inferred from a `-SNAPSHOT` version suffix.
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        scope: Scope,
        file: impl Into<PathBuf>,
    ) -> Self {
        let version = version.into();
        DependencyArtifact {
            group: group.into(),
            name: name.into(),
            snapshot: version.ends_with(SNAPSHOT_SUFFIX),
            version,
            classifier: None,
            scope,
            file: file.into(),
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    pub fn with_snapshot(mut self, snapshot: bool) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_snapshot(&self) -> bool {
        self.snapshot
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

impl fmt::Display for DependencyArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        Ok(())
    }
}
