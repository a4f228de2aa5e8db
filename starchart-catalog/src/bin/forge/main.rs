//! Forge: builds and inspects the tiered star catalog.
//!
//! Decodes a GSC 1.2 source tree into the three HEALPix tier files read by
//! the chart engine.

mod build;
mod cli;
mod info;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Build(args) => build::run(args, &cli),
        Commands::Info(args) => info::run(args),
    }
}
