//! Bundle providers: pluggable toolchain selection.
//!
//! A bundle provider knows how to compile and link for some set of
//! (host, target) pairs. The [`BundleProviderRegistry`] asks every
//! registered provider and keeps the first answer; additional answers are
//! conflicts, logged and counted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::builder::context::BuildContext;
use crate::builder::errors::BuildError;
use crate::builder::link::Linker;
use crate::builder::toolchain::{Compiler, ToolRunner};
use crate::core::environment::{Environment, EnvironmentError, EnvironmentRegistry};
use crate::core::executable::Executable;

mod compat;
mod gcc;

pub use compat::CompatibilityChecker;
pub use gcc::GccBundleProvider;

/// A source of compilers and linkers.
pub trait BundleProvider: Send + Sync {
    /// Name for log messages.
    fn name(&self) -> &str;

    /// Environments this provider adds to the registry.
    fn environments(&self) -> Vec<Environment> {
        Vec::new()
    }

    /// The environment this process runs on, if this provider can tell.
    fn determine_host_environment(&self) -> Option<Environment>;

    fn select_compiler(
        &self,
        host: &Environment,
        target: &Environment,
        ctx: &Arc<BuildContext>,
    ) -> Option<Arc<dyn Compiler>>;

    fn select_static_linker(
        &self,
        host: &Environment,
        target: &Environment,
        ctx: &Arc<BuildContext>,
    ) -> Option<Arc<dyn Linker>>;

    fn select_shared_linker(
        &self,
        host: &Environment,
        target: &Environment,
        ctx: &Arc<BuildContext>,
    ) -> Option<Arc<dyn Linker>>;

    fn select_executable_linker(
        &self,
        host: &Environment,
        target: &Environment,
        ctx: &Arc<BuildContext>,
        executable: &Executable,
    ) -> Option<Arc<dyn Linker>>;
}

/// The built-in providers, in priority order.
pub fn default_providers(runner: Arc<dyn ToolRunner>) -> Vec<Box<dyn BundleProvider>> {
    vec![
        Box::new(GccBundleProvider::linux(runner.clone())),
        Box::new(GccBundleProvider::macosx(runner)),
    ]
}

/// Aggregates providers; first answer wins.
pub struct BundleProviderRegistry {
    providers: Vec<Box<dyn BundleProvider>>,
    strict: bool,
    conflicts: AtomicUsize,
}

impl BundleProviderRegistry {
    pub fn new(providers: Vec<Box<dyn BundleProvider>>) -> Self {
        BundleProviderRegistry {
            providers,
            strict: false,
            conflicts: AtomicUsize::new(0),
        }
    }

    /// Treat any conflicting answer as a configuration error.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Number of conflicting answers seen so far.
    pub fn conflicts(&self) -> usize {
        self.conflicts.load(Ordering::Relaxed)
    }

    /// Add every provider-contributed environment not yet known.
    pub fn register_environments(
        &self,
        registry: &mut EnvironmentRegistry,
    ) -> Result<(), EnvironmentError> {
        for provider in &self.providers {
            let fresh: Vec<_> = provider
                .environments()
                .into_iter()
                .filter(|env| registry.lookup(env.canonical_name()).is_none())
                .collect();
            registry.register(fresh)?;
        }
        Ok(())
    }

    pub fn determine_host_environment(&self) -> Result<Option<Environment>, BuildError> {
        self.first_answer("host environment", |p| p.determine_host_environment())
    }

    pub fn select_compiler(
        &self,
        host: &Environment,
        target: &Environment,
        ctx: &Arc<BuildContext>,
    ) -> Result<Option<Arc<dyn Compiler>>, BuildError> {
        self.first_answer("compiler", |p| p.select_compiler(host, target, ctx))
    }

    pub fn select_static_linker(
        &self,
        host: &Environment,
        target: &Environment,
        ctx: &Arc<BuildContext>,
    ) -> Result<Option<Arc<dyn Linker>>, BuildError> {
        self.first_answer("static linker", |p| p.select_static_linker(host, target, ctx))
    }

    pub fn select_shared_linker(
        &self,
        host: &Environment,
        target: &Environment,
        ctx: &Arc<BuildContext>,
    ) -> Result<Option<Arc<dyn Linker>>, BuildError> {
        self.first_answer("shared linker", |p| p.select_shared_linker(host, target, ctx))
    }

    pub fn select_executable_linker(
        &self,
        host: &Environment,
        target: &Environment,
        ctx: &Arc<BuildContext>,
        executable: &Executable,
    ) -> Result<Option<Arc<dyn Linker>>, BuildError> {
        self.first_answer("executable linker", |p| {
            p.select_executable_linker(host, target, ctx, executable)
        })
    }

    fn first_answer<T>(
        &self,
        what: &str,
        ask: impl Fn(&dyn BundleProvider) -> Option<T>,
    ) -> Result<Option<T>, BuildError> {
        let mut chosen: Option<(&str, T)> = None;

        for provider in &self.providers {
            let Some(answer) = ask(provider.as_ref()) else {
                continue;
            };
            match &chosen {
                None => chosen = Some((provider.name(), answer)),
                Some((first, _)) => {
                    self.conflicts.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        "Bundle provider {} also offers a {}; keeping the one from {}",
                        provider.name(),
                        what,
                        first
                    );
                    if self.strict {
                        return Err(BuildError::Config(format!(
                            "bundle providers {} and {} both offer a {}",
                            first,
                            provider.name(),
                            what
                        )));
                    }
                }
            }
        }

        if let Some((name, _)) = &chosen {
            tracing::debug!("Using {} from bundle provider {}", what, name);
        }
        Ok(chosen.map(|(_, answer)| answer))
    }
}
