//! Shared library linker.

use std::path::PathBuf;
use std::sync::Arc;

use crate::builder::context::BuildContext;
use crate::builder::errors::BuildError;
use crate::builder::toolchain::{CommandSpec, GccFlavor, ToolRunner};
use crate::core::environment::Environment;
use crate::core::source_file::SourceFile;
use crate::util::fs::ensure_dir;

use super::Linker;

/// Produces `lib<project><suffix>.<version>` in the shared output directory.
///
/// Always relinks from every object.
pub struct GccSharedLinker {
    ctx: Arc<BuildContext>,
    target: Environment,
    flavor: GccFlavor,
    runner: Arc<dyn ToolRunner>,
}

impl GccSharedLinker {
    pub fn new(
        ctx: Arc<BuildContext>,
        target: Environment,
        flavor: GccFlavor,
        runner: Arc<dyn ToolRunner>,
    ) -> Self {
        GccSharedLinker {
            ctx,
            target,
            flavor,
            runner,
        }
    }

    /// `lib<project><suffix>`, the name recorded in the library itself.
    pub fn library_name(&self) -> String {
        format!(
            "lib{}{}",
            self.ctx.project_name,
            self.target.shared_library_suffix()
        )
    }

    /// `lib<project><suffix>.<version>`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.library_name(), self.ctx.project_version)
    }
}

impl Linker for GccSharedLinker {
    fn link(
        &self,
        all: &[SourceFile],
        _compiled: &[SourceFile],
        _libs: &[PathBuf],
    ) -> Result<(), BuildError> {
        if all.is_empty() {
            tracing::debug!("{}: no objects for a shared library", self.target);
            return Ok(());
        }

        let dir = self.ctx.layout.shared_output_dir(&self.target, self.ctx.test);
        ensure_dir(&dir)?;

        let file_name = self.file_name();
        let output = dir.join(&file_name);
        if output.exists() {
            std::fs::remove_file(&output).map_err(|e| BuildError::io(&output, e))?;
        }

        let cmd = CommandSpec::new(self.flavor.driver)
            .cwd(&dir)
            .arg("-shared")
            .args(self.flavor.soname_args(&self.library_name()))
            .arg(self.flavor.machine_flag)
            .arg("-o")
            .arg(&file_name)
            .args(self.flavor.default_libraries.iter().copied())
            .args(all.iter().map(|f| f.object().display().to_string()));
        self.runner.run_checked(&cmd)?;

        tracing::info!("{}: linked {}", self.target, file_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_context, ScriptedRunner};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn setup(tmp: &TempDir, env: Environment, flavor: GccFlavor) -> (GccSharedLinker, Arc<ScriptedRunner>) {
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = Arc::new(test_context(tmp.path()));
        (GccSharedLinker::new(ctx, env, flavor, runner.clone()), runner)
    }

    #[test]
    fn test_links_every_object_with_versioned_name() {
        let tmp = TempDir::new().unwrap();
        let (linker, runner) = setup(&tmp, Environment::linux_64(), GccFlavor::LINUX_64);
        let all = vec![
            SourceFile::new("/src/a.cpp", Path::new("/obj")),
            SourceFile::new("/src/b.cpp", Path::new("/obj")),
        ];

        linker.link(&all, &all[..1], &[]).unwrap();

        let calls = runner.calls_to("gcc");
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args,
            vec![
                "-shared",
                "-Wl,-soname,libdemo.so",
                "-m64",
                "-o",
                "libdemo.so.1.0.0",
                "-lstdc++",
                "/obj/a.o",
                "/obj/b.o",
            ]
        );
        assert!(tmp
            .path()
            .join("target/attached/shared/linux_64/libdemo.so.1.0.0")
            .exists());
    }

    #[test]
    fn test_relinks_missing_library_when_nothing_compiled() {
        let tmp = TempDir::new().unwrap();
        let (linker, runner) = setup(&tmp, Environment::linux_64(), GccFlavor::LINUX_64);
        let all = vec![SourceFile::new("/src/a.cpp", Path::new("/obj"))];

        linker.link(&all, &[], &[]).unwrap();

        assert_eq!(runner.calls_to("gcc").len(), 1);
        assert!(tmp
            .path()
            .join("target/attached/shared/linux_64/libdemo.so.1.0.0")
            .exists());
    }

    #[test]
    fn test_no_objects_links_nothing() {
        let tmp = TempDir::new().unwrap();
        let (linker, runner) = setup(&tmp, Environment::linux_64(), GccFlavor::LINUX_64);

        linker.link(&[], &[], &[]).unwrap();
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_replaces_existing_library() {
        let tmp = TempDir::new().unwrap();
        let (linker, _runner) = setup(&tmp, Environment::macosx_64(), GccFlavor::MACOSX_64);
        let dir = tmp.path().join("target/attached/shared/macosx_64");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("libdemo.dylib.1.0.0"), "stale").unwrap();

        let all = vec![SourceFile::new("/src/a.cpp", Path::new("/obj"))];
        linker.link(&all, &all, &[]).unwrap();

        assert_eq!(
            fs::read_to_string(dir.join("libdemo.dylib.1.0.0")).unwrap(),
            "binary"
        );
    }
}
