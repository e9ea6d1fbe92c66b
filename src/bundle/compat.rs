//! Host/target compatibility checks shared by bundle providers.

use std::sync::{Arc, OnceLock};

use crate::builder::toolchain::{CommandSpec, ToolRunner};
use crate::core::environment::Environment;
use crate::util::process::find_executable;

/// Decides whether a provider can build for a (host, target) pair.
///
/// A host is supported when it is in the provider's host set and the
/// provider's tool can be run there. The tool is probed at most once per
/// checker.
pub struct CompatibilityChecker {
    tool: &'static str,
    hosts: Vec<Environment>,
    targets: Vec<Environment>,
    runner: Arc<dyn ToolRunner>,
    /// Cached probe result (lazily computed)
    tool_available: OnceLock<bool>,
}

impl CompatibilityChecker {
    pub fn new(
        tool: &'static str,
        hosts: Vec<Environment>,
        targets: Vec<Environment>,
        runner: Arc<dyn ToolRunner>,
    ) -> Self {
        CompatibilityChecker {
            tool,
            hosts,
            targets,
            runner,
            tool_available: OnceLock::new(),
        }
    }

    pub fn tool(&self) -> &str {
        self.tool
    }

    pub fn is_tool_available(&self) -> bool {
        *self.tool_available.get_or_init(|| {
            let available = self
                .runner
                .probe(&CommandSpec::new(self.tool).arg("--version"));
            match find_executable(self.tool) {
                Some(path) if available => {
                    tracing::debug!("Using {} at {}", self.tool, path.display())
                }
                _ if available => tracing::debug!("Tool {} responded to probe", self.tool),
                _ => tracing::debug!("Tool {} is not available", self.tool),
            }
            available
        })
    }

    pub fn is_host_supported(&self, host: &Environment) -> bool {
        self.hosts.contains(host) && self.is_tool_available()
    }

    pub fn is_target_supported(&self, target: &Environment) -> bool {
        self.targets.contains(target)
    }

    /// Whether `target` can be built from `host`.
    pub fn is_compatible(&self, host: &Environment, target: &Environment) -> bool {
        if !self.hosts.contains(host) || !self.is_target_supported(target) {
            tracing::debug!(
                "{} toolchain does not support building {} on {}",
                self.tool,
                target,
                host
            );
            return false;
        }
        if !self.is_tool_available() {
            tracing::warn!(
                "{} could be built on {} but {} is not installed",
                target,
                host,
                self.tool
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRunner;

    fn checker(runner: Arc<ScriptedRunner>) -> CompatibilityChecker {
        CompatibilityChecker::new(
            "gcc",
            vec![Environment::linux_32(), Environment::linux_64()],
            vec![Environment::linux_32(), Environment::linux_64()],
            runner,
        )
    }

    #[test]
    fn test_compatible_pairs() {
        let c = checker(Arc::new(ScriptedRunner::new()));

        assert!(c.is_compatible(&Environment::linux_64(), &Environment::linux_32()));
        assert!(!c.is_compatible(&Environment::linux_64(), &Environment::win_64()));
        assert!(!c.is_compatible(&Environment::macosx_64(), &Environment::linux_64()));
        assert!(c.is_host_supported(&Environment::linux_32()));
    }

    #[test]
    fn test_missing_tool_is_probed_once() {
        let runner = Arc::new(ScriptedRunner::new().missing("gcc"));
        let c = checker(runner.clone());

        assert!(!c.is_compatible(&Environment::linux_64(), &Environment::linux_64()));
        assert!(!c.is_host_supported(&Environment::linux_64()));
        assert_eq!(runner.calls_to("gcc").len(), 1);
    }
}
