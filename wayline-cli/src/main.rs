//! Wayline CLI - Replay and simulate navigation sessions
//!
//! Feeds position samples through a route processor and prints every result
//! batch, either from a recorded sample file or from a simulated drive along
//! the route.

mod commands;
mod error;
mod output;
mod runner;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::replay::ReplayArgs;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "wayline", version, about = "Route progress tracking for turn-by-turn navigation")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Configuration file (default: ~/.wayline/config.ini)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log filter directive, e.g. "wayline=debug" (RUST_LOG takes precedence)
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_filter: Option<String>,

    /// Disable colored log output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay recorded position samples against a route
    Replay(ReplayArgs),

    /// Simulate a drive along a route at constant speed
    Simulate(SimulateArgs),

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Replay(args) => commands::replay::run(&cli.global, args),
        Commands::Simulate(args) => commands::simulate::run(&cli.global, args),
        Commands::Config { command } => commands::config::run(&cli.global, command),
    }
}
