//! Replay command - feed recorded samples through a session.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use wayline::route::Route;
use wayline::sample::PositionSample;

use super::common::{drive, print_summary, read_json, Feed, SessionArgs};
use crate::error::CliError;
use crate::runner::CliRunner;
use crate::GlobalArgs;

/// Arguments for the replay command.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Recorded samples (JSON array of position samples)
    pub samples: PathBuf,

    /// Start with a synthetic sample at the route origin
    #[arg(long)]
    pub from_origin: bool,

    /// Delay between samples in milliseconds (0 replays as fast as possible)
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub pace_ms: u64,
}

/// Run the replay command.
pub fn run(global: &GlobalArgs, args: ReplayArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(global)?;
    runner.log_startup("replay");

    let options = args.session.options(runner.config())?;
    let route: Route = read_json(&args.session.route)?;
    let samples: Vec<PositionSample> = read_json(&args.samples)?;
    if samples.is_empty() && !args.from_origin {
        return Err(CliError::Usage(format!(
            "{} contains no samples",
            args.samples.display()
        )));
    }

    tracing::info!(
        route = %args.session.route.display(),
        samples = samples.len(),
        distance = route.distance(),
        "Replaying samples"
    );

    let initial_at = if args.from_origin {
        let first = samples.first().map(|s| s.timestamp_millis);
        Some(first.map_or_else(|| chrono::Utc::now().timestamp_millis(), |ts| ts - 1_000))
    } else {
        None
    };

    let feed = Feed {
        initial_at,
        samples,
        pace: (args.pace_ms > 0).then(|| Duration::from_millis(args.pace_ms)),
    };

    let milestones = args.session.milestones();
    let summary = drive(&runner, route, options, milestones, feed, args.session.format)?;
    print_summary(&summary);
    Ok(())
}
