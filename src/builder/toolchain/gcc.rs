//! GCC-family toolchain.
//!
//! Every supported platform uses the same GCC driver strategy; the
//! differences between them live in a [`GccFlavor`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::batch::ColocatedBatch;
use crate::builder::context::BuildContext;
use crate::builder::errors::BuildError;
use crate::builder::judge::{GccRecompilationJudge, RecompilationJudge};
use crate::core::artifact::Scope;
use crate::core::environment::Environment;
use crate::core::source_file::SourceFile;
use crate::util::fs::ensure_dir;

use super::{CommandSpec, Compiler, ToolRunner};

/// Arguments every compile gets: object only, dependency record, PIC.
pub const MANDATORY_COMPILE_ARGS: &[&str] = &["-c", "-MMD", "-fPIC"];

/// How a shared library records its own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SonameStyle {
    /// `-Wl,-soname,<lib>`
    Elf,
    /// `-Wl,-dylib_install_name -Wl,<lib>`
    Darwin,
}

/// Per-platform parameters of the GCC strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GccFlavor {
    /// Compiler and linker driver
    pub driver: &'static str,
    /// Static archiver
    pub archiver: &'static str,
    /// Word-size flag passed to every compile and link
    pub machine_flag: &'static str,
    pub soname: SonameStyle,
    /// Whether executables wrap objects and libraries in
    /// `--start-group`/`--end-group`
    pub link_groups: bool,
    /// Libraries appended to every link
    pub default_libraries: &'static [&'static str],
}

impl GccFlavor {
    pub const LINUX_32: GccFlavor = GccFlavor::linux("-m32");
    pub const LINUX_64: GccFlavor = GccFlavor::linux("-m64");
    pub const MACOSX_32: GccFlavor = GccFlavor::darwin("-m32");
    pub const MACOSX_64: GccFlavor = GccFlavor::darwin("-m64");

    const fn linux(machine_flag: &'static str) -> Self {
        GccFlavor {
            driver: "gcc",
            archiver: "ar",
            machine_flag,
            soname: SonameStyle::Elf,
            link_groups: true,
            default_libraries: &["-lstdc++"],
        }
    }

    const fn darwin(machine_flag: &'static str) -> Self {
        GccFlavor {
            soname: SonameStyle::Darwin,
            link_groups: false,
            ..GccFlavor::linux(machine_flag)
        }
    }

    /// Linker arguments that record `lib_name` as the library's own name.
    pub fn soname_args(&self, lib_name: &str) -> Vec<String> {
        match self.soname {
            SonameStyle::Elf => vec![format!("-Wl,-soname,{lib_name}")],
            SonameStyle::Darwin => vec![
                "-Wl,-dylib_install_name".to_string(),
                format!("-Wl,{lib_name}"),
            ],
        }
    }
}

/// Compiles colocated batches with a GCC driver.
///
/// A single-file batch names its outputs explicitly with `-o`/`-MF`. GCC
/// refuses `-o` with several inputs, so multi-file batches run in the
/// target's object directory with absolute source paths and GCC drops
/// `<stem>.o`/`<stem>.d` there. Source directories are never written to,
/// so several targets may compile the same sources at once.
pub struct GccCompiler {
    ctx: Arc<BuildContext>,
    target: Environment,
    flavor: GccFlavor,
    runner: Arc<dyn ToolRunner>,
    judge: GccRecompilationJudge,
    include_args: Vec<String>,
}

impl GccCompiler {
    /// Create a compiler for `target`.
    ///
    /// Include directories of extracted dependencies are looked up here, so
    /// dependencies must already be extracted.
    pub fn new(
        ctx: Arc<BuildContext>,
        target: Environment,
        flavor: GccFlavor,
        runner: Arc<dyn ToolRunner>,
    ) -> Self {
        let include_args = include_directories(&ctx, &target)
            .into_iter()
            .map(|dir| format!("-I{}", dir.display()))
            .collect();

        GccCompiler {
            ctx,
            target,
            flavor,
            runner,
            judge: GccRecompilationJudge,
            include_args,
        }
    }

    fn base_command(&self, cwd: &Path) -> CommandSpec {
        CommandSpec::new(self.flavor.driver)
            .cwd(cwd)
            .args(MANDATORY_COMPILE_ARGS.iter().copied())
            .arg(self.flavor.machine_flag)
            .args(self.ctx.compiler_argv(&self.target))
            .args(self.include_args.iter().cloned())
    }

    fn compile_colocated(&self, batch: &ColocatedBatch) -> Result<(), BuildError> {
        match batch.files() {
            [single] => {
                let cmd = self
                    .base_command(batch.directory())
                    .arg("-o")
                    .path_arg(single.object())
                    .arg("-MF")
                    .path_arg(single.dependency())
                    .arg(single.file_name().to_string_lossy());
                self.runner.run_checked(&cmd)?;
            }
            files => {
                let Some(obj_dir) = files.first().and_then(|f| f.object().parent()) else {
                    return Ok(());
                };
                let cmd = self
                    .base_command(obj_dir)
                    .args(files.iter().map(|f| f.source().to_string_lossy().into_owned()));
                self.runner.run_checked(&cmd)?;
            }
        }
        Ok(())
    }
}

impl Compiler for GccCompiler {
    fn target(&self) -> &Environment {
        &self.target
    }

    fn needs_compilation(&self, file: &SourceFile) -> Result<bool, BuildError> {
        self.judge.needs_compilation(file)
    }

    fn compile(&self, files: &[SourceFile]) -> Result<(), BuildError> {
        for file in files {
            if let Some(parent) = file.object().parent() {
                ensure_dir(parent)?;
            }
        }

        let mut dispersed = files.to_vec();
        while let Some(batch) = ColocatedBatch::drain_from(&mut dispersed) {
            self.compile_colocated(&batch)?;
        }
        Ok(())
    }
}

/// Include directories for compiling `target`, in search order.
pub fn include_directories(ctx: &BuildContext, target: &Environment) -> Vec<PathBuf> {
    let layout = &ctx.layout;
    let mut dirs = vec![
        layout.include_dir(None, ctx.test),
        layout.include_dir(Some(target), ctx.test),
    ];
    dirs.extend(dependency_include_dirs(ctx, target, Scope::Compile));

    if ctx.test {
        dirs.push(layout.include_dir(None, false));
        dirs.extend(dependency_include_dirs(ctx, target, Scope::Test));
    }
    dirs
}

fn dependency_include_dirs(ctx: &BuildContext, target: &Environment, scope: Scope) -> Vec<PathBuf> {
    ctx.layout
        .dependency_directories(scope, Some(target), true)
        .into_iter()
        .map(|dir| dir.join("include"))
        .filter(|dir| dir.exists())
        .collect()
}
