//! Core data structures for Anvil.
//!
//! This module contains the value types the engine passes around:
//! - Environments and the registry that names them
//! - Source records with their derived object paths
//! - Executable descriptors
//! - Resolved dependency artifacts

pub mod artifact;
pub mod environment;
pub mod executable;
pub mod source_file;

pub use artifact::{DependencyArtifact, Scope};
pub use environment::{Environment, EnvironmentError, EnvironmentRegistry};
pub use executable::{Executable, ExecutableDescriptor};
pub use source_file::SourceFile;
