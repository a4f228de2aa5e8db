//! CLI argument definitions for forge

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "forge")]
#[command(about = "Star catalog tier builder")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build hp48/hp192/hp768 tier files from a GSC source tree
    Build(BuildArgs),

    /// Print header and cell statistics for built tier files
    Info(InfoArgs),
}

#[derive(Parser)]
pub struct BuildArgs {
    /// Directory tree holding .GSC or .GSC.gz region files
    #[arg(long)]
    pub source: PathBuf,

    /// Output directory for the tier files
    #[arg(long)]
    pub target: PathBuf,

    /// Number of threads for parallel decoding (0 = all cores)
    #[arg(short, long, default_value = "0")]
    pub threads: usize,

    /// Hide the progress bar
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Parser)]
pub struct InfoArgs {
    /// Directory holding the tier files
    #[arg(long)]
    pub target: PathBuf,
}
