//! Linkers turning compiled objects into libraries and executables.
//!
//! Every linker sees the full set of source records of a target, the
//! records compiled in this run, and the external libraries discovered for
//! the target. Each decides for itself how much work is needed.

use std::path::PathBuf;

use crate::builder::errors::BuildError;
use crate::core::source_file::SourceFile;

mod executable;
mod shared_lib;
mod static_lib;

pub use executable::GccExecutableLinker;
pub use shared_lib::GccSharedLinker;
pub use static_lib::{StaticLinker, ARCHIVE_BATCH_SIZE};

/// One output-producing link step.
pub trait Linker: Send + Sync {
    fn link(
        &self,
        all: &[SourceFile],
        compiled: &[SourceFile],
        libs: &[PathBuf],
    ) -> Result<(), BuildError>;
}
