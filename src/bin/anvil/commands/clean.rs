//! `anvil clean` command

use std::path::Path;

use anyhow::Result;

use anvil::util::config::BuildConfig;
use anvil::util::fs::remove_dir_all_if_exists;

pub fn execute(manifest_path: &Path) -> Result<()> {
    let config = BuildConfig::load(manifest_path)?;
    let build_dir = config.build_dir();

    remove_dir_all_if_exists(&build_dir)?;
    eprintln!("     Removed {}", build_dir.display());

    Ok(())
}
