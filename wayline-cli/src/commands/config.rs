//! Configuration CLI commands.
//!
//! `config path` prints where the configuration file is read from, and
//! `config show` prints the effective options after defaults are applied.

use clap::Subcommand;
use wayline::config::ConfigFile;

use crate::error::CliError;
use crate::runner::load_config;
use crate::GlobalArgs;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective navigation and logging settings
    Show,
}

/// Run a config subcommand.
pub fn run(global: &GlobalArgs, command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Show => run_show(global),
    }
}

fn run_path(global: &GlobalArgs) -> Result<(), CliError> {
    let path = global.config.clone().or_else(ConfigFile::default_path);
    match path {
        Some(path) if path.exists() => println!("{}", path.display()),
        Some(path) => println!("{} (not found, using defaults)", path.display()),
        None => println!("(no home directory, using defaults)"),
    }
    Ok(())
}

fn run_show(global: &GlobalArgs) -> Result<(), CliError> {
    let config = load_config(global)?;
    let options = config.navigation_options()?;
    let logging = config.logging_config()?;

    println!("Configuration Settings");
    println!("======================");
    println!();
    println!("[navigation]");
    println!("  snap_to_route = {}", options.snap_to_route);
    println!(
        "  step_completion_radius_meters = {}",
        options.step_completion_radius_meters
    );
    println!();
    println!("[off_route]");
    let off_route = &options.off_route;
    println!("  tolerance_meters = {}", off_route.tolerance_meters);
    println!("  max_accuracy_bonus_meters = {}", off_route.max_accuracy_bonus_meters);
    println!("  maneuver_zone_radius_meters = {}", off_route.maneuver_zone_radius_meters);
    println!("  moving_away_threshold = {}", off_route.moving_away_threshold);
    println!("  minimum_distance_meters = {}", off_route.minimum_distance_meters);
    println!("  radius_growth_rate = {}", off_route.radius_growth_rate);
    println!();
    println!("[faster_route]");
    let faster = &options.faster_route;
    println!("  enabled = {}", faster.enabled);
    println!("  min_check_interval_millis = {}", faster.min_check_interval_millis);
    println!("  min_distance_meters = {}", faster.min_distance_meters);
    println!();
    println!("[location]");
    let location = &options.location;
    println!("  acceptable_accuracy_meters = {}", location.acceptable_accuracy_meters);
    println!("  accuracy_percent_threshold = {}", location.accuracy_percent_threshold);
    println!("  stale_after_millis = {}", location.stale_after_millis);
    println!("  max_velocity_mps = {}", location.max_velocity_mps);
    println!(
        "  off_route_accuracy_ceiling_meters = {}",
        location.off_route_accuracy_ceiling_meters
    );
    println!();
    println!("[logging]");
    println!("  filter = {}", logging.filter);
    match &logging.directory {
        Some(directory) => println!("  directory = {}", directory.display()),
        None => println!("  directory = (not set)"),
    }
    println!("  file_prefix = {}", logging.file_prefix);
    println!("  ansi = {}", logging.ansi);

    Ok(())
}
