//! Build context - project identity, layout, and per-environment arguments.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::environment::Environment;
use crate::util::layout::BuildLayout;

/// Key whose arguments apply to every environment.
pub const ALL_ENVIRONMENTS: &str = "all";

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Everything a compiler or linker needs to know about the build it is
/// part of. Shared read-only between targets and worker threads.
#[derive(Clone)]
pub struct BuildContext {
    /// Directory layout
    pub layout: BuildLayout,

    /// Project name, used for library file names
    pub project_name: String,

    /// Project version, appended to shared library names
    pub project_version: String,

    /// Whether this is a test build
    pub test: bool,

    /// Number of compile workers; `None` means available parallelism
    pub jobs: Option<usize>,

    compiler_arguments: BTreeMap<String, String>,

    linker_arguments: BTreeMap<String, String>,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("project", &format!("{}-{}", self.project_name, self.project_version))
            .field("base_dir", &self.layout.base_dir())
            .field("build_dir", &self.layout.build_dir())
            .field("test", &self.test)
            .field("jobs", &self.jobs)
            .finish()
    }
}

impl BuildContext {
    /// Create a new build context.
    pub fn new(
        layout: BuildLayout,
        project_name: impl Into<String>,
        project_version: impl Into<String>,
    ) -> Self {
        BuildContext {
            layout,
            project_name: project_name.into(),
            project_version: project_version.into(),
            test: false,
            jobs: None,
            compiler_arguments: BTreeMap::new(),
            linker_arguments: BTreeMap::new(),
        }
    }

    /// Build the test sources instead of the main ones.
    pub fn with_test(mut self, test: bool) -> Self {
        self.test = test;
        self
    }

    /// Set the worker count.
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Set compiler arguments keyed by `all` or environment name.
    pub fn with_compiler_arguments(mut self, args: BTreeMap<String, String>) -> Self {
        self.compiler_arguments = lowercase_keys(args);
        self
    }

    /// Set linker arguments keyed by `all` or environment name.
    pub fn with_linker_arguments(mut self, args: BTreeMap<String, String>) -> Self {
        self.linker_arguments = lowercase_keys(args);
        self
    }

    /// Compiler arguments for `env`, as a single normalised string.
    pub fn compiler_arguments(&self, env: &Environment) -> String {
        environment_arguments(&self.compiler_arguments, env)
    }

    /// Linker arguments for `env`, as a single normalised string.
    pub fn linker_arguments(&self, env: &Environment) -> String {
        environment_arguments(&self.linker_arguments, env)
    }

    /// Compiler arguments for `env`, split into argv entries.
    pub fn compiler_argv(&self, env: &Environment) -> Vec<String> {
        split_arguments(&self.compiler_arguments(env))
    }

    /// Linker arguments for `env`, split into argv entries.
    pub fn linker_argv(&self, env: &Environment) -> Vec<String> {
        split_arguments(&self.linker_arguments(env))
    }

    /// `lib<project>.a` inside the static output directory.
    pub fn static_library(&self, env: &Environment) -> PathBuf {
        self.layout
            .static_output_dir(env, self.test)
            .join(format!("lib{}.a", self.project_name))
    }
}

fn lowercase_keys(args: BTreeMap<String, String>) -> BTreeMap<String, String> {
    args.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect()
}

/// Arguments for all environments followed by those for `env`, with every
/// whitespace run collapsed to a single space.
pub fn environment_arguments(args: &BTreeMap<String, String>, env: &Environment) -> String {
    let mut joined = String::new();
    for key in [ALL_ENVIRONMENTS, env.canonical_name()] {
        if let Some(value) = args.get(key) {
            joined.push(' ');
            joined.push_str(value);
        }
    }
    WHITESPACE_RUN
        .replace_all(&joined, " ")
        .trim()
        .to_string()
}

/// Split a line produced by [`environment_arguments`] into argv entries.
pub fn split_arguments(line: &str) -> Vec<String> {
    line.split(' ')
        .filter(|arg| !arg.is_empty())
        .map(str::to_string)
        .collect()
}
