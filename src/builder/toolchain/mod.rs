//! Toolchain abstraction.
//!
//! Compilers and linkers describe the processes they want to run as
//! [`CommandSpec`]s and hand them to a [`ToolRunner`]. Production code uses
//! [`SystemRunner`]; tests substitute a scripted runner that records the
//! commands and fakes their outputs.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::builder::errors::BuildError;
use crate::core::environment::Environment;
use crate::core::source_file::SourceFile;
use crate::util::process::{ProcessBuilder, COMMAND_NOT_FOUND};

mod gcc;

pub use gcc::{GccCompiler, GccFlavor, SonameStyle};

/// A command to execute, with program, arguments, and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The program to run (e.g., "gcc", "ar")
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
    /// Working directory
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Add a path argument.
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    /// Set the working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// The command line as it would be typed.
    pub fn display(&self) -> String {
        self.to_process().display_command()
    }

    fn to_process(&self) -> ProcessBuilder {
        let mut process = ProcessBuilder::new(&self.program).args(&self.args);
        if let Some(cwd) = &self.cwd {
            process = process.cwd(cwd);
        }
        process
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Captured result of running a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external tools.
pub trait ToolRunner: Send + Sync {
    /// Run the command to completion and capture its output.
    fn run(&self, command: &CommandSpec) -> Result<ToolOutput, BuildError>;

    /// Run the command and treat a non-zero exit as [`BuildError::ToolFailed`].
    fn run_checked(&self, command: &CommandSpec) -> Result<ToolOutput, BuildError> {
        let output = self.run(command)?;
        if !output.success() {
            return Err(BuildError::ToolFailed {
                command: command.display(),
                status: output.status,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }

    /// Whether the command's program can be run at all. A non-zero exit
    /// still counts as available unless it is [`COMMAND_NOT_FOUND`].
    fn probe(&self, command: &CommandSpec) -> bool {
        match self.run(command) {
            Ok(output) => output.status != Some(COMMAND_NOT_FOUND),
            Err(_) => false,
        }
    }
}

/// Runs tools as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, command: &CommandSpec) -> Result<ToolOutput, BuildError> {
        let output = command.to_process().exec()?;
        let result = ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.stderr.is_empty() {
            tracing::debug!("{}", result.stderr.trim_end());
        }
        Ok(result)
    }

    fn probe(&self, command: &CommandSpec) -> bool {
        command.to_process().probe()
    }
}

/// Compiles batches of source files for one target environment.
pub trait Compiler: Send + Sync {
    /// The environment this compiler produces code for.
    fn target(&self) -> &Environment;

    /// Whether `file` is stale and must be compiled.
    fn needs_compilation(&self, file: &SourceFile) -> Result<bool, BuildError>;

    /// Compile every file in `files`, leaving each object and dependency
    /// record at the paths the [`SourceFile`] names.
    fn compile(&self, files: &[SourceFile]) -> Result<(), BuildError>;
}
