//! Test utilities and fakes for Anvil unit tests.
//!
//! [`ScriptedRunner`] stands in for the real toolchain: it records every
//! command and writes the files a GCC driver or `ar` would have produced,
//! so compile and link code can be tested without a compiler installed.
//!
//! # Example
//!
//! ```rust,ignore
//! let runner = Arc::new(ScriptedRunner::new().fail_on("broken.cpp"));
//! let compiler = GccCompiler::new(ctx, Environment::linux_64(), GccFlavor::LINUX_64, runner.clone());
//! compiler.compile(&files)?;
//! assert_eq!(runner.calls().len(), 2);
//! ```

pub mod fixtures;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::builder::context::BuildContext;
use crate::builder::errors::BuildError;
use crate::builder::toolchain::{CommandSpec, ToolOutput, ToolRunner};
use crate::core::source_file::SourceFile;
use crate::util::layout::BuildLayout;
use crate::util::process::COMMAND_NOT_FOUND;

pub use fixtures::*;

/// Context for a project named `demo` at `base`, building into `base/target`.
pub fn test_context(base: &Path) -> BuildContext {
    BuildContext::new(
        BuildLayout::new(base, base.join("target")),
        "demo",
        "1.0.0",
    )
}

/// Fake toolchain runner.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<CommandSpec>>,
    fail_on: Vec<String>,
    missing: Vec<String>,
    responses: Vec<(String, String)>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any command with an argument containing `needle`.
    pub fn fail_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on.push(needle.into());
        self
    }

    /// Report `program` as not installed (exit status 127).
    pub fn missing(mut self, program: impl Into<String>) -> Self {
        self.missing.push(program.into());
        self
    }

    /// Answer every run of `program` with `stdout`.
    pub fn respond(mut self, program: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.responses.push((program.into(), stdout.into()));
        self
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Commands whose program is `program`.
    pub fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == Path::new(program))
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn resolve(cmd: &CommandSpec, arg: &str) -> PathBuf {
        match &cmd.cwd {
            Some(cwd) => cwd.join(arg),
            None => PathBuf::from(arg),
        }
    }

    fn value_after<'a>(cmd: &'a CommandSpec, flag: &str) -> Option<&'a str> {
        cmd.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| cmd.args.get(i + 1))
            .map(String::as_str)
    }

    fn fake_compile(cmd: &CommandSpec) {
        let sources: Vec<&String> = cmd
            .args
            .iter()
            .filter(|a| !a.starts_with('-') && SourceFile::is_source(Path::new(a)))
            .collect();
        let machine = cmd
            .args
            .iter()
            .find(|a| *a == "-m32" || *a == "-m64")
            .map(String::as_str)
            .unwrap_or("default flags");
        let contents = format!("object built with {machine}");

        if let Some(object) = Self::value_after(cmd, "-o") {
            let object = Self::resolve(cmd, object);
            let source = sources.first().map(|s| s.as_str()).unwrap_or_default();
            fs::write(&object, &contents).unwrap();
            if let Some(record) = Self::value_after(cmd, "-MF") {
                fs::write(
                    Self::resolve(cmd, record),
                    format!("{}: {}\n", object.display(), source),
                )
                .unwrap();
            }
            return;
        }

        for source in sources {
            let stem = Path::new(source)
                .file_stem()
                .unwrap()
                .to_string_lossy()
                .into_owned();
            fs::write(Self::resolve(cmd, &format!("{stem}.o")), &contents).unwrap();
            fs::write(
                Self::resolve(cmd, &format!("{stem}.d")),
                format!("{stem}.o: {source}\n"),
            )
            .unwrap();
        }
    }

    fn fake_archive(cmd: &CommandSpec) {
        let archive = Self::resolve(cmd, &cmd.args[1]);
        let mut contents = fs::read_to_string(&archive).unwrap_or_default();
        for member in &cmd.args[2..] {
            contents.push_str(member);
            contents.push('\n');
        }
        fs::write(archive, contents).unwrap();
    }

    fn fake_link(cmd: &CommandSpec) {
        if let Some(output) = Self::value_after(cmd, "-o") {
            fs::write(Self::resolve(cmd, output), "binary").unwrap();
        }
    }
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, command: &CommandSpec) -> Result<ToolOutput, BuildError> {
        self.calls.lock().unwrap().push(command.clone());
        let program = command.program.to_string_lossy();

        if self.missing.iter().any(|m| *m == program) {
            return Ok(ToolOutput {
                status: Some(COMMAND_NOT_FOUND),
                ..ToolOutput::default()
            });
        }
        if let Some((_, stdout)) = self.responses.iter().find(|(p, _)| *p == program) {
            return Ok(ToolOutput {
                status: Some(0),
                stdout: stdout.clone(),
                stderr: String::new(),
            });
        }

        if let Some(needle) = self
            .fail_on
            .iter()
            .find(|n| command.args.iter().any(|a| a.contains(n.as_str())))
        {
            return Ok(ToolOutput {
                status: Some(1),
                stdout: String::new(),
                stderr: format!("error: scripted failure on {needle}"),
            });
        }

        match program.as_ref() {
            "ar" => Self::fake_archive(command),
            _ if command.args.iter().any(|a| a == "-c") => Self::fake_compile(command),
            _ => Self::fake_link(command),
        }

        Ok(ToolOutput {
            status: Some(0),
            ..ToolOutput::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scripted_runner_records_and_fails() {
        let runner = ScriptedRunner::new().fail_on("bad");
        let ok = runner.run(&CommandSpec::new("true").arg("good")).unwrap();
        let failed = runner.run(&CommandSpec::new("true").arg("bad")).unwrap();

        assert!(ok.success());
        assert!(!failed.success());
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn test_scripted_runner_fakes_archive() {
        let tmp = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        let cmd = CommandSpec::new("ar")
            .args(["rc", "libdemo.a", "/obj/a.o"])
            .cwd(tmp.path());
        runner.run(&cmd).unwrap();
        runner.run(&cmd).unwrap();

        let contents = fs::read_to_string(tmp.path().join("libdemo.a")).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert_eq!(runner.calls_to("ar").len(), 2);
    }

    #[test]
    fn test_scripted_runner_missing_and_responses() {
        let runner = ScriptedRunner::new()
            .missing("gcc")
            .respond("uname", "x86_64\n");

        assert!(!runner.probe(&CommandSpec::new("gcc").arg("--version")));
        let out = runner.run(&CommandSpec::new("uname").arg("-m")).unwrap();
        assert_eq!(out.stdout.trim(), "x86_64");
    }
}
