//! Static archive linker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::context::BuildContext;
use crate::builder::errors::BuildError;
use crate::builder::toolchain::{CommandSpec, ToolRunner};
use crate::core::environment::Environment;
use crate::core::source_file::SourceFile;
use crate::util::fs::ensure_dir;

use super::Linker;

/// Objects per `ar` invocation, to stay under command-line limits.
pub const ARCHIVE_BATCH_SIZE: usize = 250;

/// Maintains `lib<project>.a`.
///
/// A missing archive is built from every object; an existing one only gets
/// the objects compiled in this run appended.
pub struct StaticLinker {
    ctx: Arc<BuildContext>,
    target: Environment,
    archiver: PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl StaticLinker {
    pub fn new(
        ctx: Arc<BuildContext>,
        target: Environment,
        archiver: impl Into<PathBuf>,
        runner: Arc<dyn ToolRunner>,
    ) -> Self {
        StaticLinker {
            ctx,
            target,
            archiver: archiver.into(),
            runner,
        }
    }

    fn archive_batch(&self, library: &str, dir: &Path, batch: &[SourceFile]) -> Result<(), BuildError> {
        let cmd = CommandSpec::new(&self.archiver)
            .cwd(dir)
            .arg("rc")
            .arg(library)
            .args(batch.iter().map(|f| f.object().display().to_string()));
        self.runner.run_checked(&cmd)?;
        tracing::debug!("Archived batch of {} files", batch.len());
        Ok(())
    }
}

impl Linker for StaticLinker {
    fn link(
        &self,
        all: &[SourceFile],
        compiled: &[SourceFile],
        _libs: &[PathBuf],
    ) -> Result<(), BuildError> {
        let dir = self.ctx.layout.static_output_dir(&self.target, self.ctx.test);
        ensure_dir(&dir)?;

        let library = self.ctx.static_library(&self.target);
        let to_archive = if library.exists() { compiled } else { all };

        if to_archive.is_empty() {
            tracing::debug!("No files to archive - static library will not be updated");
            return Ok(());
        }

        let name = format!("lib{}.a", self.ctx.project_name);
        let batches = to_archive.chunks(ARCHIVE_BATCH_SIZE);
        tracing::debug!(
            "Split files to archive into {} batches of up to {} each",
            batches.len(),
            ARCHIVE_BATCH_SIZE
        );
        for batch in batches {
            self.archive_batch(&name, &dir, batch)?;
        }

        tracing::info!(
            "{}: {} files archived to {}",
            self.target,
            to_archive.len(),
            name
        );
        Ok(())
    }
}
