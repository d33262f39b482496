mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nsew", about = "Four-quadrant microscopy tile stitcher")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which quadrant each file name maps to
    Identify(commands::identify::IdentifyArgs),
    /// Align and stitch up to four quadrant tiles
    Stitch(commands::stitch::StitchArgs),
    /// Stitch chip images using saved alignment parameters
    Chip(commands::chip::ChipArgs),
    /// Validate a saved alignment parameter file
    Params(commands::params::ParamsArgs),
    /// Print or save the default stitching config as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Identify(args) => commands::identify::run(args),
        Commands::Stitch(args) => commands::stitch::run(args),
        Commands::Chip(args) => commands::chip::run(args),
        Commands::Params(args) => commands::params::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
