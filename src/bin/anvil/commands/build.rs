//! `anvil build` and `anvil test` commands

use std::path::Path;

use anyhow::Result;

use crate::cli::BuildArgs;
use anvil::ops::{build, BuildOptions};
use anvil::util::config::BuildConfig;

pub fn execute(manifest_path: &Path, args: BuildArgs, test: bool) -> Result<()> {
    let config = BuildConfig::load(manifest_path)?;

    let opts = BuildOptions {
        targets: args.target,
        host: args.host,
        jobs: args.jobs,
        test,
        parallel_targets: args.parallel_targets,
    };

    let result = build(&config, &opts)?;

    for outcome in &result.targets {
        eprintln!(
            "    Finished {} ({} compiled)",
            outcome.target,
            outcome.compiled.len()
        );
    }

    Ok(())
}
