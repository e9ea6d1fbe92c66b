//! Per-target build driver.
//!
//! For one target environment: secure dependency bundles, discover the
//! sources, compile the stale ones, then run every linker the target needs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::builder::context::BuildContext;
use crate::builder::errors::{BuildError, ToolKind};
use crate::builder::link::Linker;
use crate::builder::overseer::CompilationOverseer;
use crate::bundle::BundleProviderRegistry;
use crate::core::artifact::{DependencyArtifact, Scope};
use crate::core::environment::Environment;
use crate::core::executable::ExecutableDescriptor;
use crate::core::source_file::SourceFile;
use crate::sources::DependencyExtractor;
use crate::util::fs::{ensure_dir, glob_files};

/// What building one target produced.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub target: Environment,
    /// Source records compiled in this run
    pub compiled: Vec<SourceFile>,
    /// Whether test executables must be relinked
    pub needs_test_relink: bool,
}

/// Builds a single target environment.
pub struct TargetManager<'a> {
    ctx: Arc<BuildContext>,
    providers: &'a BundleProviderRegistry,
    extractor: &'a DependencyExtractor,
    host: Environment,
    target: Environment,
    artifacts: &'a [DependencyArtifact],
    executables: &'a [ExecutableDescriptor],
    shared: bool,
}

impl<'a> TargetManager<'a> {
    pub fn new(
        ctx: Arc<BuildContext>,
        providers: &'a BundleProviderRegistry,
        extractor: &'a DependencyExtractor,
        host: Environment,
        target: Environment,
    ) -> Self {
        TargetManager {
            ctx,
            providers,
            extractor,
            host,
            target,
            artifacts: &[],
            executables: &[],
            shared: false,
        }
    }

    pub fn with_artifacts(mut self, artifacts: &'a [DependencyArtifact]) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn with_executables(mut self, executables: &'a [ExecutableDescriptor]) -> Self {
        self.executables = executables;
        self
    }

    /// Also link a shared library.
    pub fn with_shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    pub fn target(&self) -> &Environment {
        &self.target
    }

    pub fn build(&self) -> Result<TargetOutcome, BuildError> {
        self.secure_dependencies()?;

        let compiler = self
            .providers
            .select_compiler(&self.host, &self.target, &self.ctx)?
            .ok_or_else(|| self.no_toolchain(ToolKind::Compiler))?;

        let obj_dir = self.ctx.layout.obj_dir(&self.target, self.ctx.test);
        let files = self.source_files(&obj_dir);
        let compiled =
            CompilationOverseer::new(compiler.as_ref(), self.ctx.jobs).compile(&files, &obj_dir)?;
        tracing::info!(
            "{}: compiled {} of {} files",
            self.target,
            compiled.len(),
            files.len()
        );

        let static_linker = self
            .providers
            .select_static_linker(&self.host, &self.target, &self.ctx)?
            .ok_or_else(|| self.no_toolchain(ToolKind::StaticLinker))?;
        static_linker.link(&files, &compiled, &[])?;

        let libs = self.libraries()?;

        if self.shared {
            let shared_linker = self
                .providers
                .select_shared_linker(&self.host, &self.target, &self.ctx)?
                .ok_or_else(|| self.no_toolchain(ToolKind::SharedLinker))?;
            shared_linker.link(&files, &compiled, &libs)?;
        }

        if self.ctx.test {
            self.populate_test_runtime(&libs)?;
        }

        self.link_executables(&files, &compiled, &libs)?;

        Ok(TargetOutcome {
            target: self.target.clone(),
            needs_test_relink: self.ctx.test && !compiled.is_empty(),
            compiled,
        })
    }

    fn no_toolchain(&self, kind: ToolKind) -> BuildError {
        BuildError::NoCompatibleToolchain {
            kind,
            host: self.host.name().to_string(),
            target: self.target.name().to_string(),
        }
    }

    fn scopes(&self) -> Vec<Scope> {
        if self.ctx.test {
            vec![Scope::Compile, Scope::Test]
        } else {
            vec![Scope::Compile]
        }
    }

    fn secure_dependencies(&self) -> Result<(), BuildError> {
        let scopes = self.scopes();
        let wanted: Vec<DependencyArtifact> = self
            .artifacts
            .iter()
            .filter(|a| scopes.contains(&a.scope()))
            .cloned()
            .collect();
        self.extractor.extract_all(&wanted, &self.target)
    }

    /// Sources below the shared and per-target code directories, sorted.
    fn source_files(&self, obj_dir: &Path) -> Vec<SourceFile> {
        let layout = &self.ctx.layout;
        let roots = [
            layout.code_dir(None, self.ctx.test),
            layout.code_dir(Some(&self.target), self.ctx.test),
        ];

        let mut paths = Vec::new();
        for root in &roots {
            if !root.is_dir() {
                tracing::debug!("{}: no source directory at {}", self.target, root.display());
                continue;
            }
            paths.extend(
                WalkDir::new(root)
                    .into_iter()
                    .filter_map(|entry| match entry {
                        Ok(entry) => Some(entry),
                        Err(e) => {
                            tracing::warn!("{}: skipping unreadable source entry: {}", self.target, e);
                            None
                        }
                    })
                    .filter(|e| e.file_type().is_file() && SourceFile::is_source(e.path()))
                    .map(|e| e.into_path()),
            );
        }

        if paths.is_empty() {
            tracing::warn!("{}: no native code files found", self.target);
        }
        paths.sort();
        paths.dedup();
        paths
            .into_iter()
            .map(|path| SourceFile::new(path, obj_dir))
            .collect()
    }

    /// Libraries every executable links against: `lib*` files from the
    /// extracted dependencies and the prebuilt library directories, plus
    /// the project's own static archives.
    pub fn libraries(&self) -> Result<Vec<PathBuf>, BuildError> {
        let layout = &self.ctx.layout;
        let mut libs = Vec::new();

        for scope in self.scopes() {
            let test = scope == Scope::Test;
            libs.extend(glob_files(
                &layout.static_output_dir(&self.target, test),
                &["*.a"],
            )?);
            for dir in layout.dependency_directories(scope, Some(&self.target), false) {
                libs.extend(glob_files(&dir, &["lib*", "lib/lib*"])?);
            }
            for env in [None, Some(&self.target)] {
                libs.extend(glob_files(&layout.prebuilt_static_dir(env, test), &["lib*"])?);
                libs.extend(glob_files(&layout.prebuilt_shared_dir(env, test), &["lib*"])?);
            }
        }

        libs.dedup();
        Ok(libs)
    }

    /// Copy shared libraries next to test executables, dropping version
    /// suffixes (`libfoo.so.1.2` becomes `libfoo.so`).
    fn populate_test_runtime(&self, libs: &[PathBuf]) -> Result<(), BuildError> {
        let suffix = self.target.shared_library_suffix();
        let runtime = self.ctx.layout.test_runtime_dir(&self.target);
        let own = glob_files(
            &self.ctx.layout.shared_output_dir(&self.target, false),
            &["lib*"],
        )?;

        for lib in libs.iter().chain(own.iter()) {
            let Some(name) = lib.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(end) = name.find(suffix) else {
                continue;
            };
            ensure_dir(&runtime)?;
            let dest = runtime.join(&name[..end + suffix.len()]);
            fs::copy(lib, &dest).map_err(|e| BuildError::io(&dest, e))?;
            tracing::debug!("Copied {} to {}", lib.display(), dest.display());
        }
        Ok(())
    }

    fn link_executables(
        &self,
        files: &[SourceFile],
        compiled: &[SourceFile],
        libs: &[PathBuf],
    ) -> Result<(), BuildError> {
        let base = self.ctx.layout.base_dir();
        for descriptor in self.executables.iter().filter(|d| d.applies_to(&self.target)) {
            for executable in descriptor.resolve(base, files)? {
                let linker = self
                    .providers
                    .select_executable_linker(&self.host, &self.target, &self.ctx, &executable)?
                    .ok_or_else(|| self.no_toolchain(ToolKind::ExecutableLinker))?;
                linker.link(files, compiled, libs)?;
            }
        }
        Ok(())
    }
}
