//! On-disk layout of sources and build outputs.
//!
//! ```text
//! <base>/src[/<env>]/<main|test>/{cpp,include,lib/static,lib/shared}
//! <build>/obj/<env>                     <build>/test-obj/<env>
//! <build>/attached/{static,shared,executables}/<env>
//! <build>/test-attached/{static,shared,executables}/<env>
//! <build>/extracted-dependencies/<scope>/<group>/<name>/<classifier|main>
//! <build>/test-runtime/<env>
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::artifact::Scope;
use crate::core::environment::{Environment, NOARCH_NAME};

const ALL_SOURCES: &str = "all";

/// Resolves every directory the engine reads from or writes to.
#[derive(Debug, Clone)]
pub struct BuildLayout {
    base_dir: PathBuf,
    build_dir: PathBuf,
    sources: BTreeMap<String, PathBuf>,
}

impl BuildLayout {
    pub fn new(base_dir: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        BuildLayout {
            base_dir: base_dir.into(),
            build_dir: build_dir.into(),
            sources: BTreeMap::new(),
        }
    }

    /// Override source roots. Keys are `all` or environment names; values
    /// are relative to the base directory.
    pub fn with_sources<'a>(mut self, sources: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (key, dir) in sources {
            self.sources
                .insert(key.to_lowercase(), self.base_dir.join(dir));
        }
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    fn source_root(&self, env: Option<&Environment>) -> PathBuf {
        let key = env.map_or(ALL_SOURCES, Environment::canonical_name);
        match self.sources.get(key) {
            Some(dir) => dir.clone(),
            None if env.is_none() => self.base_dir.join("src"),
            None => self.base_dir.join("src").join(key),
        }
    }

    /// `<root>/<main|test>` for the shared (`None`) or per-environment tree.
    pub fn sources_dir(&self, env: Option<&Environment>, test: bool) -> PathBuf {
        self.source_root(env)
            .join(if test { "test" } else { "main" })
    }

    pub fn code_dir(&self, env: Option<&Environment>, test: bool) -> PathBuf {
        self.sources_dir(env, test).join("cpp")
    }

    pub fn include_dir(&self, env: Option<&Environment>, test: bool) -> PathBuf {
        self.sources_dir(env, test).join("include")
    }

    /// Prebuilt static libraries checked into the source tree.
    pub fn prebuilt_static_dir(&self, env: Option<&Environment>, test: bool) -> PathBuf {
        self.sources_dir(env, test).join("lib/static")
    }

    /// Prebuilt shared libraries checked into the source tree.
    pub fn prebuilt_shared_dir(&self, env: Option<&Environment>, test: bool) -> PathBuf {
        self.sources_dir(env, test).join("lib/shared")
    }

    pub fn obj_dir(&self, env: &Environment, test: bool) -> PathBuf {
        self.build_dir
            .join(if test { "test-obj" } else { "obj" })
            .join(env.canonical_name())
    }

    fn attached_dir(&self, test: bool) -> PathBuf {
        self.build_dir
            .join(if test { "test-attached" } else { "attached" })
    }

    pub fn static_output_dir(&self, env: &Environment, test: bool) -> PathBuf {
        self.attached_dir(test)
            .join("static")
            .join(env.canonical_name())
    }

    pub fn shared_output_dir(&self, env: &Environment, test: bool) -> PathBuf {
        self.attached_dir(test)
            .join("shared")
            .join(env.canonical_name())
    }

    pub fn executables_output_dir(&self, env: &Environment, test: bool) -> PathBuf {
        self.attached_dir(test)
            .join("executables")
            .join(env.canonical_name())
    }

    pub fn extracted_dependencies_dir(&self, scope: Scope) -> PathBuf {
        self.build_dir
            .join("extracted-dependencies")
            .join(scope.as_str())
    }

    pub fn test_runtime_dir(&self, env: &Environment) -> PathBuf {
        self.build_dir
            .join("test-runtime")
            .join(env.canonical_name())
    }

    /// Per-environment (and optionally `noarch`) directories inside every
    /// extracted dependency of `scope`.
    ///
    /// Walks `<scope>/<group>/<name>/<classifier>` and keeps the candidate
    /// directories that exist.
    pub fn dependency_directories(
        &self,
        scope: Scope,
        env: Option<&Environment>,
        include_noarch: bool,
    ) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        let root = self.extracted_dependencies_dir(scope);

        for group in subdirectories(&root) {
            for artifact in subdirectories(&group) {
                for classifier in subdirectories(&artifact) {
                    if let Some(env) = env {
                        for candidate in env.candidate_names() {
                            let arch_dir = classifier.join(candidate);
                            if arch_dir.is_dir() {
                                dirs.push(arch_dir);
                            }
                        }
                    }
                    if include_noarch {
                        let noarch = classifier.join(NOARCH_NAME);
                        if noarch.is_dir() {
                            dirs.push(noarch);
                        }
                    }
                }
            }
        }

        dirs
    }
}

fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}
