//! Anvil CLI - a multi-target build engine for C and C++

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("anvil=debug")
    } else {
        EnvFilter::new("anvil=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Build(args) => commands::build::execute(&cli.manifest_path, args, false),
        Commands::Test(args) => commands::build::execute(&cli.manifest_path, args, true),
        Commands::Clean => commands::clean::execute(&cli.manifest_path),
        Commands::Environments => commands::environments::execute(),
    }
}
