//! GCC bundle providers for Linux and macOS.

use std::sync::Arc;

use crate::builder::context::BuildContext;
use crate::builder::link::{GccExecutableLinker, GccSharedLinker, Linker, StaticLinker};
use crate::builder::toolchain::{CommandSpec, Compiler, GccCompiler, GccFlavor, ToolRunner};
use crate::core::environment::Environment;
use crate::core::executable::Executable;

use super::{BundleProvider, CompatibilityChecker};

/// Builds 32- and 64-bit code for one operating system with GCC.
pub struct GccBundleProvider {
    name: &'static str,
    /// Value of `std::env::consts::OS` this provider runs on
    os: &'static str,
    current_os: &'static str,
    /// `uname` flag reporting the hardware platform
    uname_flag: &'static str,
    env_32: Environment,
    env_64: Environment,
    flavor_32: GccFlavor,
    flavor_64: GccFlavor,
    checker: CompatibilityChecker,
    runner: Arc<dyn ToolRunner>,
}

impl GccBundleProvider {
    pub fn linux(runner: Arc<dyn ToolRunner>) -> Self {
        Self::new(
            "gcc-linux",
            "linux",
            "-i",
            (Environment::linux_32(), GccFlavor::LINUX_32),
            (Environment::linux_64(), GccFlavor::LINUX_64),
            runner,
        )
    }

    pub fn macosx(runner: Arc<dyn ToolRunner>) -> Self {
        Self::new(
            "gcc-macosx",
            "macos",
            "-m",
            (Environment::macosx_32(), GccFlavor::MACOSX_32),
            (Environment::macosx_64(), GccFlavor::MACOSX_64),
            runner,
        )
    }

    fn new(
        name: &'static str,
        os: &'static str,
        uname_flag: &'static str,
        (env_32, flavor_32): (Environment, GccFlavor),
        (env_64, flavor_64): (Environment, GccFlavor),
        runner: Arc<dyn ToolRunner>,
    ) -> Self {
        let supported = vec![env_32.clone(), env_64.clone()];
        GccBundleProvider {
            name,
            os,
            current_os: std::env::consts::OS,
            uname_flag,
            checker: CompatibilityChecker::new(
                flavor_64.driver,
                supported.clone(),
                supported,
                runner.clone(),
            ),
            env_32,
            env_64,
            flavor_32,
            flavor_64,
            runner,
        }
    }

    /// Pretend to run on `os` instead of the real operating system.
    pub fn with_current_os(mut self, os: &'static str) -> Self {
        self.current_os = os;
        self
    }

    fn flavor(&self, host: &Environment, target: &Environment) -> Option<GccFlavor> {
        if !self.checker.is_compatible(host, target) {
            return None;
        }
        if *target == self.env_32 {
            Some(self.flavor_32)
        } else {
            Some(self.flavor_64)
        }
    }

    fn uname(&self, flag: &str) -> Option<String> {
        match self.runner.run_checked(&CommandSpec::new("uname").arg(flag)) {
            Ok(output) => Some(output.stdout.trim().to_string()),
            Err(e) => {
                tracing::warn!("Could not determine host platform: {}", e);
                None
            }
        }
    }

    fn environment_for_platform(&self, platform: &str) -> Option<Environment> {
        if platform.contains("i386") || platform.contains("i686") {
            Some(self.env_32.clone())
        } else if platform.contains("x86_64") {
            Some(self.env_64.clone())
        } else {
            None
        }
    }
}

impl BundleProvider for GccBundleProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn environments(&self) -> Vec<Environment> {
        vec![self.env_32.clone(), self.env_64.clone()]
    }

    fn determine_host_environment(&self) -> Option<Environment> {
        if self.current_os != self.os {
            tracing::debug!("{}: not running on {}", self.name, self.os);
            return None;
        }

        let mut platform = self.uname(self.uname_flag)?;
        // Some Linux distributions answer `unknown` to `uname -i`.
        if platform == "unknown" && self.uname_flag != "-m" {
            platform = self.uname("-m")?;
        }

        let host = self.environment_for_platform(&platform);
        match &host {
            Some(env) => tracing::debug!("{}: host environment is {}", self.name, env),
            None => tracing::debug!("{}: unrecognised platform `{}`", self.name, platform),
        }
        host
    }

    fn select_compiler(
        &self,
        host: &Environment,
        target: &Environment,
        ctx: &Arc<BuildContext>,
    ) -> Option<Arc<dyn Compiler>> {
        let flavor = self.flavor(host, target)?;
        Some(Arc::new(GccCompiler::new(
            ctx.clone(),
            target.clone(),
            flavor,
            self.runner.clone(),
        )))
    }

    fn select_static_linker(
        &self,
        host: &Environment,
        target: &Environment,
        ctx: &Arc<BuildContext>,
    ) -> Option<Arc<dyn Linker>> {
        let flavor = self.flavor(host, target)?;
        Some(Arc::new(StaticLinker::new(
            ctx.clone(),
            target.clone(),
            flavor.archiver,
            self.runner.clone(),
        )))
    }

    fn select_shared_linker(
        &self,
        host: &Environment,
        target: &Environment,
        ctx: &Arc<BuildContext>,
    ) -> Option<Arc<dyn Linker>> {
        let flavor = self.flavor(host, target)?;
        Some(Arc::new(GccSharedLinker::new(
            ctx.clone(),
            target.clone(),
            flavor,
            self.runner.clone(),
        )))
    }

    fn select_executable_linker(
        &self,
        host: &Environment,
        target: &Environment,
        ctx: &Arc<BuildContext>,
        executable: &Executable,
    ) -> Option<Arc<dyn Linker>> {
        let flavor = self.flavor(host, target)?;
        Some(Arc::new(GccExecutableLinker::new(
            ctx.clone(),
            target.clone(),
            flavor,
            self.runner.clone(),
            executable.clone(),
        )))
    }
}
