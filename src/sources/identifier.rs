//! Identity of one extracted slice of a dependency bundle.

use std::fmt;
use std::path::PathBuf;

use crate::core::artifact::DependencyArtifact;
use crate::core::environment::{Environment, NOARCH_NAME};
use crate::util::layout::BuildLayout;

/// Classifier directory used when an artifact has none.
pub const DEFAULT_CLASSIFIER: &str = "main";

/// An artifact paired with the slice of its bundle to extract: `noarch` or
/// one environment's canonical name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyIdentifier {
    artifact: DependencyArtifact,
    discriminator: String,
}

impl DependencyIdentifier {
    pub fn noarch(artifact: &DependencyArtifact) -> Self {
        DependencyIdentifier {
            artifact: artifact.clone(),
            discriminator: NOARCH_NAME.to_string(),
        }
    }

    pub fn for_environment(artifact: &DependencyArtifact, env: &Environment) -> Self {
        DependencyIdentifier {
            artifact: artifact.clone(),
            discriminator: env.canonical_name().to_string(),
        }
    }

    pub fn artifact(&self) -> &DependencyArtifact {
        &self.artifact
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// `<extracted>/<scope>/<group>/<name>/<classifier|main>`
    ///
    /// Shared by every discriminator of the same artifact; each slice lands
    /// in its own subdirectory below it.
    pub fn destination(&self, layout: &BuildLayout) -> PathBuf {
        layout
            .extracted_dependencies_dir(self.artifact.scope())
            .join(self.artifact.group())
            .join(self.artifact.name())
            .join(self.artifact.classifier().unwrap_or(DEFAULT_CLASSIFIER))
    }

    /// Prefix of the bundle entries that belong to this slice.
    pub fn entry_prefix(&self) -> String {
        format!("{}/", self.discriminator)
    }
}

impl fmt::Display for DependencyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.artifact, self.discriminator)
    }
}
