//! Executable linker.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::builder::context::BuildContext;
use crate::builder::errors::BuildError;
use crate::builder::toolchain::{CommandSpec, GccFlavor, ToolRunner};
use crate::core::environment::Environment;
use crate::core::executable::Executable;
use crate::core::source_file::SourceFile;
use crate::util::fs::{ensure_dir, modified};

use super::Linker;

/// Links one resolved [`Executable`] against the target's libraries.
pub struct GccExecutableLinker {
    ctx: Arc<BuildContext>,
    target: Environment,
    flavor: GccFlavor,
    runner: Arc<dyn ToolRunner>,
    executable: Executable,
}

impl GccExecutableLinker {
    pub fn new(
        ctx: Arc<BuildContext>,
        target: Environment,
        flavor: GccFlavor,
        runner: Arc<dyn ToolRunner>,
        executable: Executable,
    ) -> Self {
        GccExecutableLinker {
            ctx,
            target,
            flavor,
            runner,
            executable,
        }
    }

    pub fn output(&self) -> PathBuf {
        self.ctx
            .layout
            .executables_output_dir(&self.target, self.ctx.test)
            .join(self.executable.name())
    }

    /// Runtime search path baked into the executable.
    ///
    /// Test executables look in the test runtime directory; everything else
    /// uses the descriptor's rpath plus the sibling shared output directory.
    pub fn rpath_argument(&self) -> String {
        if self.ctx.test {
            format!(
                "-Wl,-rpath,{}",
                self.ctx.layout.test_runtime_dir(&self.target).display()
            )
        } else {
            format!(
                "-Wl,{},-rpath,$ORIGIN/../../shared/{}",
                self.executable.descriptor().rpath(),
                self.target.canonical_name()
            )
        }
    }

    fn is_up_to_date(&self, output: &Path, libs: &[PathBuf]) -> Result<bool, BuildError> {
        let Some(built) = modified(output)? else {
            return Ok(false);
        };

        let inputs = self
            .executable
            .objects()
            .into_iter()
            .chain(libs.iter().map(PathBuf::as_path));
        for input in inputs {
            match modified(input)? {
                Some(time) if time <= built => {}
                Some(_) => {
                    tracing::debug!(
                        "{} is newer than {}",
                        input.display(),
                        output.display()
                    );
                    return Ok(false);
                }
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    fn command(&self, dir: &Path, libs: &[PathBuf]) -> CommandSpec {
        let mut cmd = CommandSpec::new(self.flavor.driver)
            .cwd(dir)
            .arg(self.rpath_argument())
            .arg("-o")
            .arg(self.executable.name())
            .arg(self.flavor.machine_flag);

        if self.flavor.link_groups {
            cmd = cmd.arg("-Wl,--start-group");
        }
        cmd = cmd
            .args(self.executable.objects().iter().map(|o| o.display().to_string()))
            .args(libs.iter().map(|l| l.display().to_string()))
            .args(self.flavor.default_libraries.iter().copied());
        if self.flavor.link_groups {
            cmd = cmd.arg("-Wl,--end-group");
        }
        cmd.args(self.ctx.linker_argv(&self.target))
    }
}

impl Linker for GccExecutableLinker {
    fn link(
        &self,
        _all: &[SourceFile],
        _compiled: &[SourceFile],
        libs: &[PathBuf],
    ) -> Result<(), BuildError> {
        let name = self.executable.name();
        if self.executable.files().is_empty() {
            tracing::debug!("{}: executable {} has no files, skipping", self.target, name);
            return Ok(());
        }

        let dir = self
            .ctx
            .layout
            .executables_output_dir(&self.target, self.ctx.test);
        let output = dir.join(name);
        if self.is_up_to_date(&output, libs)? {
            tracing::debug!("{}: executable {} is up to date", self.target, name);
            return Ok(());
        }

        ensure_dir(&dir)?;
        let started = Instant::now();
        self.runner.run_checked(&self.command(&dir, libs))?;

        tracing::info!(
            "{}: linked executable {} in {:.2}s",
            self.target,
            name,
            started.elapsed().as_secs_f64()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::executable::ExecutableDescriptor;
    use crate::test_support::{test_context, write_with_age, ScriptedRunner};
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        ctx: Arc<BuildContext>,
        executable: Executable,
        runner: Arc<ScriptedRunner>,
    }

    fn fixture(test: bool) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let ctx = Arc::new(test_context(tmp.path()).with_test(test));
        let env = Environment::linux_64();
        let cpp = ctx.layout.code_dir(None, false);
        write_with_age(&cpp.join("main.cpp"), "int main() {}", 100);
        let file = SourceFile::new(cpp.join("main.cpp"), &ctx.layout.obj_dir(&env, test));
        write_with_age(file.object(), "object", 50);

        let executable = ExecutableDescriptor::named("app")
            .resolve(tmp.path(), &[file])
            .unwrap()
            .remove(0);

        Fixture {
            _tmp: tmp,
            ctx,
            executable,
            runner: Arc::new(ScriptedRunner::new()),
        }
    }

    impl Fixture {
        fn linker(&self, flavor: GccFlavor, env: Environment) -> GccExecutableLinker {
            GccExecutableLinker::new(
                self.ctx.clone(),
                env,
                flavor,
                self.runner.clone(),
                self.executable.clone(),
            )
        }
    }

    #[test]
    fn test_link_command_layout() {
        let fx = fixture(false);
        let linker = fx.linker(GccFlavor::LINUX_64, Environment::linux_64());
        let lib = PathBuf::from("/deps/libz.a");

        linker.link(&[], &[], std::slice::from_ref(&lib)).unwrap();

        let calls = fx.runner.calls_to("gcc");
        assert_eq!(calls.len(), 1);
        let args = &calls[0].args;
        assert_eq!(args[0], "-Wl,-rpath,$ORIGIN,-rpath,$ORIGIN/../../shared/linux_64");
        assert_eq!(&args[1..4], &["-o", "app", "-m64"]);
        assert_eq!(args[4], "-Wl,--start-group");
        assert_eq!(args[5], fx.executable.objects()[0].display().to_string());
        assert_eq!(args[6], "/deps/libz.a");
        assert_eq!(args[7], "-lstdc++");
        assert_eq!(args[8], "-Wl,--end-group");
        assert!(linker.output().exists());
    }

    #[test]
    fn test_darwin_has_no_link_groups() {
        let fx = fixture(false);
        let linker = fx.linker(GccFlavor::MACOSX_64, Environment::macosx_64());

        linker.link(&[], &[], &[]).unwrap();

        let calls = fx.runner.calls();
        assert!(!calls[0].args.iter().any(|a| a.contains("group")));
    }

    #[test]
    fn test_test_build_uses_runtime_rpath() {
        let fx = fixture(true);
        let linker = fx.linker(GccFlavor::LINUX_64, Environment::linux_64());
        let expected = format!(
            "-Wl,-rpath,{}",
            fx.ctx
                .layout
                .test_runtime_dir(&Environment::linux_64())
                .display()
        );
        assert_eq!(linker.rpath_argument(), expected);
    }

    #[test]
    fn test_up_to_date_executable_is_not_relinked() {
        let fx = fixture(false);
        let linker = fx.linker(GccFlavor::LINUX_64, Environment::linux_64());
        linker.link(&[], &[], &[]).unwrap();
        assert_eq!(fx.runner.calls().len(), 1);

        linker.link(&[], &[], &[]).unwrap();
        assert_eq!(fx.runner.calls().len(), 1);

        // A newer library forces a relink.
        let lib = fx.ctx.layout.build_dir().join("libnew.a");
        fs::write(&lib, "lib").unwrap();
        crate::test_support::set_mtime(
            &lib,
            SystemTime::now() + Duration::from_secs(60),
        );
        linker.link(&[], &[], &[lib]).unwrap();
        assert_eq!(fx.runner.calls().len(), 2);
    }
}
