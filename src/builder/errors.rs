//! Typed errors raised by the build engine.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::environment::EnvironmentError;

/// Which kind of tool a provider was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Compiler,
    StaticLinker,
    SharedLinker,
    ExecutableLinker,
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ToolKind::Compiler => "compiler",
            ToolKind::StaticLinker => "static linker",
            ToolKind::SharedLinker => "shared linker",
            ToolKind::ExecutableLinker => "executable linker",
        })
    }
}

/// Every fatal failure the engine can report.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(
        "no {kind} for target environment `{target}` is compatible with host environment `{host}`"
    )]
    NoCompatibleToolchain {
        kind: ToolKind,
        host: String,
        target: String,
    },

    #[error(transparent)]
    UnknownEnvironment(#[from] EnvironmentError),

    #[error("unable to determine host environment; set `build.host` explicitly")]
    HostUndetermined,

    #[error("dependency artifact `{artifact}` has no backing file at {}", path.display())]
    MissingArtifact { artifact: String, path: PathBuf },

    #[error("executable `{name}` is invalid: {reason}")]
    InvalidExecutable { name: String, reason: String },

    #[error("{0}")]
    Config(String),

    #[error("`{command}` failed with exit code {status:?}\n{stderr}")]
    ToolFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("failed to spawn `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "dependency record {} lists `{path}`, which resolves to neither {} nor {}",
        record.display(),
        absolute.display(),
        relative.display()
    )]
    UnresolvedInclude {
        record: PathBuf,
        path: String,
        absolute: PathBuf,
        relative: PathBuf,
    },

    #[error("compilation aborted")]
    CompilationAborted(#[source] Box<BuildError>),

    #[error("unable to queue {} for compilation", file.display())]
    QueueFull { file: PathBuf },

    #[error("failed to extract `{artifact}`")]
    Extraction {
        artifact: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("I/O error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        BuildError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// The error that actually caused a compilation pass to abort.
    pub fn root(&self) -> &BuildError {
        match self {
            BuildError::CompilationAborted(inner) => inner.root(),
            other => other,
        }
    }
}
