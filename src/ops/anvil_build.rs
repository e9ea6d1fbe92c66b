//! Implementation of `anvil build`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::builder::context::BuildContext;
use crate::builder::errors::BuildError;
use crate::builder::target::{TargetManager, TargetOutcome};
use crate::builder::toolchain::SystemRunner;
use crate::bundle::{default_providers, BundleProvider, BundleProviderRegistry};
use crate::core::environment::{Environment, EnvironmentRegistry};
use crate::ops::currency;
use crate::sources::DependencyExtractor;
use crate::util::config::BuildConfig;
use crate::util::layout::BuildLayout;

/// Command-line overrides for the manifest's `[build]` table.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Target environments (empty = manifest targets, else the host)
    pub targets: Vec<String>,

    /// Host environment name
    pub host: Option<String>,

    /// Number of parallel compile jobs
    pub jobs: Option<usize>,

    /// Build the test sources
    pub test: bool,

    /// Build targets concurrently
    pub parallel_targets: bool,
}

/// Result of a build.
#[derive(Debug)]
pub struct BuildResult {
    pub host: Environment,
    pub targets: Vec<TargetOutcome>,
}

impl BuildResult {
    /// Number of files compiled across all targets.
    pub fn compiled(&self) -> usize {
        self.targets.iter().map(|t| t.compiled.len()).sum()
    }
}

/// Build every requested target with the built-in toolchain providers.
pub fn build(config: &BuildConfig, opts: &BuildOptions) -> Result<BuildResult> {
    build_with_providers(config, opts, default_providers(Arc::new(SystemRunner)))
}

/// Build every requested target, selecting toolchains from `providers`.
pub fn build_with_providers(
    config: &BuildConfig,
    opts: &BuildOptions,
    providers: Vec<Box<dyn BundleProvider>>,
) -> Result<BuildResult> {
    let providers =
        BundleProviderRegistry::new(providers).with_strict(config.build.strict_providers);
    let mut environments = EnvironmentRegistry::new();
    providers.register_environments(&mut environments)?;

    let host = determine_host(config, opts, &providers, &environments)?;
    let targets = resolve_targets(config, opts, &environments, &host)?;
    tracing::debug!(
        "Host {}, targets {}",
        host,
        targets
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let base_dir = config.base_dir();
    let build_dir = config.build_dir();
    currency::ensure_current(config.manifest_path.as_deref(), &build_dir)?;

    let layout = BuildLayout::new(&base_dir, &build_dir).with_sources(&config.sources);
    let ctx = Arc::new(
        BuildContext::new(layout, &config.project.name, &config.project.version)
            .with_test(opts.test || config.build.test)
            .with_jobs(opts.jobs.or(config.build.jobs))
            .with_compiler_arguments(config.compiler_arguments.clone())
            .with_linker_arguments(config.linker_arguments.clone()),
    );

    let extractor = DependencyExtractor::new(ctx.layout.clone());
    let artifacts = config.artifacts();
    let executables = config.executable_descriptors();

    let build_target = |target: &Environment| -> Result<TargetOutcome, BuildError> {
        let started = Instant::now();
        let outcome = TargetManager::new(
            ctx.clone(),
            &providers,
            &extractor,
            host.clone(),
            target.clone(),
        )
        .with_artifacts(&artifacts)
        .with_executables(&executables)
        .with_shared(config.build.shared)
        .build()?;
        tracing::debug!(
            "{}: built in {:.2}s",
            target,
            started.elapsed().as_secs_f64()
        );
        Ok(outcome)
    };

    let outcomes: Result<Vec<_>, BuildError> = if opts.parallel_targets || config.build.parallel_targets
    {
        targets.par_iter().map(build_target).collect()
    } else {
        targets.iter().map(build_target).collect()
    };
    let outcomes = outcomes.with_context(|| format!("failed to build `{}`", config.project.name))?;

    currency::mark_current(&build_dir)?;

    Ok(BuildResult {
        host,
        targets: outcomes,
    })
}

fn determine_host(
    config: &BuildConfig,
    opts: &BuildOptions,
    providers: &BundleProviderRegistry,
    environments: &EnvironmentRegistry,
) -> Result<Environment, BuildError> {
    if let Some(name) = opts.host.as_ref().or(config.build.host.as_ref()) {
        return Ok(environments.get(name)?);
    }
    providers
        .determine_host_environment()?
        .ok_or(BuildError::HostUndetermined)
}

fn resolve_targets(
    config: &BuildConfig,
    opts: &BuildOptions,
    environments: &EnvironmentRegistry,
    host: &Environment,
) -> Result<Vec<Environment>, BuildError> {
    let names = if opts.targets.is_empty() {
        &config.build.targets
    } else {
        &opts.targets
    };
    if names.is_empty() {
        return Ok(vec![host.clone()]);
    }

    // Each entry may itself be a comma-separated list.
    let split: Vec<&str> = names
        .iter()
        .flat_map(|n| n.split(','))
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();
    let mut seen = HashSet::new();
    let targets = environments
        .get_all(&split)?
        .into_iter()
        .filter(|env| seen.insert(env.clone()))
        .collect();
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::GccBundleProvider;
    use crate::test_support::{age_tree, ScriptedRunner};
    use std::fs;
    use tempfile::TempDir;

    fn project(manifest: &str) -> (TempDir, BuildConfig) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Anvil.toml");
        fs::write(&path, manifest).unwrap();
        let cpp = tmp.path().join("src/main/cpp");
        fs::create_dir_all(&cpp).unwrap();
        fs::write(cpp.join("main.cpp"), "int main() { return 0; }").unwrap();
        age_tree(tmp.path(), 60);
        let config = BuildConfig::load(&path).unwrap();
        (tmp, config)
    }

    fn providers(runner: &Arc<ScriptedRunner>) -> Vec<Box<dyn BundleProvider>> {
        vec![Box::new(GccBundleProvider::linux(runner.clone()))]
    }

    #[test]
    fn test_builds_every_target() {
        let (tmp, config) = project(
            r#"
[project]
name = "demo"
version = "2.0"

[build]
host = "linux_x64"
targets = ["linux_32, linux_64"]
shared = true

[[executable]]
name = "app"
"#,
        );
        let runner = Arc::new(ScriptedRunner::new());

        let result =
            build_with_providers(&config, &BuildOptions::default(), providers(&runner)).unwrap();

        assert_eq!(result.host, Environment::linux_64());
        assert_eq!(result.targets.len(), 2);
        assert_eq!(result.compiled(), 2);
        for target in ["linux_32", "linux_64"] {
            let attached = tmp.path().join("target/attached");
            assert!(attached.join("static").join(target).join("libdemo.a").exists());
            assert!(attached.join("shared").join(target).join("libdemo.so.2.0").exists());
            assert!(attached.join("executables").join(target).join("app").exists());
        }
        assert!(tmp.path().join("target").join(currency::STAMP_NAME).exists());
    }

    #[test]
    fn test_parallel_targets_match_sequential() {
        let (_tmp, config) = project(
            r#"
[project]
name = "demo"

[build]
host = "linux_64"
targets = ["linux_32", "linux_64"]
"#,
        );
        let runner = Arc::new(ScriptedRunner::new());
        let opts = BuildOptions {
            parallel_targets: true,
            jobs: Some(2),
            ..BuildOptions::default()
        };

        let result = build_with_providers(&config, &opts, providers(&runner)).unwrap();
        assert_eq!(result.compiled(), 2);
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let (_tmp, config) = project(
            r#"
[project]
name = "demo"

[build]
host = "linux_64"
"#,
        );
        let runner = Arc::new(ScriptedRunner::new());
        let opts = BuildOptions {
            targets: vec!["amiga".to_string()],
            ..BuildOptions::default()
        };

        let err = build_with_providers(&config, &opts, providers(&runner)).unwrap_err();
        assert!(format!("{err:#}").contains("amiga"));
    }

    #[test]
    fn test_targets_are_deduplicated_across_aliases() {
        let (_tmp, config) = project(
            r#"
[project]
name = "demo"

[build]
targets = ["linux_64", "linux_32", "linux_x64", "LINUX_32"]
"#,
        );
        let environments = EnvironmentRegistry::new();

        let targets = resolve_targets(
            &config,
            &BuildOptions::default(),
            &environments,
            &Environment::linux_64(),
        )
        .unwrap();
        assert_eq!(targets, vec![Environment::linux_64(), Environment::linux_32()]);
    }

    #[test]
    fn test_undetermined_host() {
        let (_tmp, config) = project("[project]\nname = \"demo\"\n");

        let err = build_with_providers(&config, &BuildOptions::default(), Vec::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::HostUndetermined)
        ));
    }

    #[test]
    fn test_failed_compile_fails_build() {
        let (_tmp, config) = project("[project]\nname = \"demo\"\n[build]\nhost = \"linux_64\"\n");
        let runner = Arc::new(ScriptedRunner::new().fail_on("main.cpp"));

        let err = build_with_providers(&config, &BuildOptions::default(), providers(&runner))
            .unwrap_err();
        let root = err.downcast_ref::<BuildError>().unwrap();
        assert!(matches!(root, BuildError::CompilationAborted(_)));
    }
}
