//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use anvil::util::config::MANIFEST_NAME;

/// Anvil - a multi-target build engine for C and C++
#[derive(Parser)]
#[command(name = "anvil")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the project manifest
    #[arg(long, global = true, env = "ANVIL_MANIFEST", default_value = MANIFEST_NAME)]
    pub manifest_path: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile and link the project for each target
    Build(BuildArgs),

    /// Compile and link the test sources
    Test(BuildArgs),

    /// Remove the build directory
    Clean,

    /// List known target environments
    Environments,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Target environments to build (comma-separated or repeated)
    #[arg(long)]
    pub target: Vec<String>,

    /// Host environment (auto-detected by default)
    #[arg(long)]
    pub host: Option<String>,

    /// Number of parallel compile jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Build targets concurrently
    #[arg(long)]
    pub parallel_targets: bool,
}
