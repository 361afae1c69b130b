//! Common types and utilities shared across session commands.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use serde::de::DeserializeOwned;
use wayline::config::ConfigFile;
use wayline::milestone::{Milestone, Trigger};
use wayline::options::NavigationOptions;
use wayline::processor::RouteProcessor;
use wayline::route::Route;
use wayline::sample::PositionSample;

use crate::error::CliError;
use crate::output::{OutputFormat, PrinterTotals, UpdatePrinter};
use crate::runner::CliRunner;

/// Route and option overrides shared by `replay` and `simulate`.
#[derive(Debug, Clone, Args)]
pub struct SessionArgs {
    /// Route file (JSON)
    pub route: PathBuf,

    /// Report raw positions instead of positions snapped onto the route
    #[arg(long)]
    pub no_snap: bool,

    /// Enable periodic faster-route checks
    #[arg(long)]
    pub faster_route: bool,

    /// Base off-route tolerance in meters
    #[arg(long, value_name = "METERS")]
    pub tolerance: Option<f64>,

    /// Consecutive away-from-maneuver updates before declaring off-route
    #[arg(long, value_name = "COUNT")]
    pub away_threshold: Option<u32>,

    /// Announce the upcoming maneuver when this close to it (meters)
    #[arg(long, value_name = "METERS", default_value_t = 200.0)]
    pub announce_at: f64,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

impl SessionArgs {
    /// Config file options with command-line overrides applied.
    pub fn options(&self, config: &ConfigFile) -> Result<NavigationOptions, CliError> {
        let mut options = config.navigation_options()?;
        if self.no_snap {
            options.snap_to_route = false;
        }
        if self.faster_route {
            options.faster_route.enabled = true;
        }
        if let Some(tolerance) = self.tolerance {
            options.off_route.tolerance_meters = tolerance;
        }
        if let Some(count) = self.away_threshold {
            options.off_route.moving_away_threshold = count;
        }
        options.validate()?;
        Ok(options)
    }

    /// Route start, step change and maneuver announcements.
    pub fn milestones(&self) -> Vec<Milestone> {
        vec![
            Milestone::new(1, Trigger::RouteStarted)
                .with_template("Starting route, {route_distance_remaining} m to go"),
            Milestone::new(2, Trigger::StepReached { step: None })
                .with_template("{instruction}")
                .with_default_instruction("Continue"),
            Milestone::new(
                3,
                Trigger::DistanceRemaining {
                    meters: self.announce_at,
                },
            )
            .with_template("In {step_distance_remaining} m, {instruction}"),
        ]
    }
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let content = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// How samples are fed to the processor.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    /// Enqueue a route-origin initial sample at this time first.
    pub initial_at: Option<i64>,
    pub samples: Vec<PositionSample>,
    /// Wait for each update and sleep this long before the next sample.
    pub pace: Option<Duration>,
}

/// Session totals.
#[derive(Debug, Clone, Copy)]
pub struct DriveSummary {
    pub enqueued: usize,
    pub totals: PrinterTotals,
    pub interrupted: bool,
}

/// Run one session over `feed`, printing every update. Ctrl+C ends the
/// session early and discards whatever is still queued.
pub fn drive(
    runner: &CliRunner,
    route: Route,
    options: NavigationOptions,
    milestones: Vec<Milestone>,
    feed: Feed,
    format: OutputFormat,
) -> Result<DriveSummary, CliError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received shutdown signal, ending session...");
        shutdown_clone.store(true, Ordering::SeqCst);
    })?;

    let printer = Arc::new(UpdatePrinter::new(format));
    let processor = RouteProcessor::new(printer.clone());

    runner.block_on(async {
        processor.bind_session_with_milestones(route, options, milestones)?;

        if let Some(now) = feed.initial_at {
            processor.enqueue_initial(None, now)?;
        }

        let mut enqueued = 0usize;
        for sample in feed.samples {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            processor.enqueue(sample)?;
            enqueued += 1;

            if let Some(pace) = feed.pace {
                processor.flush().await?;
                tokio::time::sleep(pace).await;
            }
        }

        let interrupted = shutdown.load(Ordering::SeqCst);
        if !interrupted {
            processor.flush().await?;
        }
        processor.end_session().await;

        Ok::<_, CliError>(DriveSummary {
            enqueued,
            totals: printer.totals(),
            interrupted,
        })
    })
}

/// Print the end-of-session summary to stderr.
pub fn print_summary(summary: &DriveSummary) {
    eprintln!();
    eprintln!("Session Summary");
    eprintln!("───────────────");
    eprintln!("  Samples enqueued:  {}", summary.enqueued);
    eprintln!("  Updates delivered: {}", summary.totals.delivered);
    eprintln!("  Milestones fired:  {}", summary.totals.milestones);
    eprintln!("  Off-route updates: {}", summary.totals.off_route);
    if summary.interrupted {
        eprintln!("  (interrupted, remaining samples discarded)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args() -> SessionArgs {
        SessionArgs {
            route: PathBuf::from("route.json"),
            no_snap: false,
            faster_route: false,
            tolerance: None,
            away_threshold: None,
            announce_at: 200.0,
            format: OutputFormat::Json,
        }
    }

    #[test]
    fn test_overrides_applied() {
        let config = ConfigFile::parse("[off_route]\ntolerance_meters = 35\n").unwrap();
        let mut args = args();
        args.no_snap = true;
        args.faster_route = true;
        args.away_threshold = Some(2);

        let options = args.options(&config).unwrap();
        assert!(!options.snap_to_route);
        assert!(options.faster_route.enabled);
        assert_eq!(options.off_route.tolerance_meters, 35.0);
        assert_eq!(options.off_route.moving_away_threshold, 2);

        args.tolerance = Some(12.0);
        assert_eq!(args.options(&config).unwrap().off_route.tolerance_meters, 12.0);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut args = args();
        args.away_threshold = Some(0);
        assert!(matches!(
            args.options(&ConfigFile::default()),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_read_json_errors_name_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = read_json::<Route>(file.path()).unwrap_err();
        assert!(matches!(err, CliError::Json { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));

        let missing = read_json::<Route>(Path::new("/nonexistent/route.json")).unwrap_err();
        assert!(matches!(missing, CliError::Read { .. }));
    }
}
