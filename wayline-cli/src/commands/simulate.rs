//! Simulate command - drive along the route at constant speed.
//!
//! Samples are generated every `interval` by walking the concatenated route
//! geometry. A lateral offset shifts every sample sideways, which is enough
//! to exercise off-route detection without a recorded trace.

use std::time::Duration;

use clap::Args;
use wayline::geometry::{self, GeoPoint};
use wayline::route::Route;
use wayline::sample::PositionSample;

use super::common::{drive, print_summary, read_json, Feed, SessionArgs};
use crate::error::CliError;
use crate::runner::CliRunner;
use crate::GlobalArgs;

/// Source id of generated samples.
const SIMULATED_SOURCE: &str = "simulated";

/// Vertices closer than this are treated as the same point when joining steps.
const JOIN_EPSILON_METERS: f64 = 0.01;

/// Arguments for the simulate command.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Speed in meters per second
    #[arg(long, default_value_t = 13.9)]
    pub speed: f64,

    /// Time between samples in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 1_000)]
    pub interval_ms: u64,

    /// Shift samples this many meters to the right of the route
    #[arg(long, value_name = "METERS", default_value_t = 0.0)]
    pub offset: f64,

    /// Reported horizontal accuracy in meters
    #[arg(long, value_name = "METERS")]
    pub accuracy: Option<f64>,

    /// Emit samples in real time instead of as fast as possible
    #[arg(long)]
    pub realtime: bool,
}

/// Run the simulate command.
pub fn run(global: &GlobalArgs, args: SimulateArgs) -> Result<(), CliError> {
    if !(args.speed.is_finite() && args.speed > 0.0) {
        return Err(CliError::Usage(format!(
            "--speed must be positive, got {}",
            args.speed
        )));
    }
    if args.interval_ms == 0 {
        return Err(CliError::Usage("--interval-ms must be positive".to_string()));
    }

    let runner = CliRunner::new(global)?;
    runner.log_startup("simulate");

    let options = args.session.options(runner.config())?;
    let route: Route = read_json(&args.session.route)?;
    // Reject a broken route before generating samples for it.
    route.validate().map_err(wayline::processor::ProcessorError::from)?;

    let start_millis = chrono::Utc::now().timestamp_millis();
    let plan = DrivePlan {
        speed: args.speed,
        interval_millis: args.interval_ms as i64,
        offset: args.offset,
        accuracy: args.accuracy,
    };
    let samples = plan.samples(&route_line(&route), start_millis + args.interval_ms as i64);

    tracing::info!(
        route = %args.session.route.display(),
        samples = samples.len(),
        speed = args.speed,
        interval_ms = args.interval_ms,
        "Simulating drive"
    );

    let feed = Feed {
        initial_at: Some(start_millis),
        samples,
        pace: args.realtime.then(|| Duration::from_millis(args.interval_ms)),
    };

    let milestones = args.session.milestones();
    let summary = drive(&runner, route, options, milestones, feed, args.session.format)?;
    print_summary(&summary);
    Ok(())
}

/// All step geometries of all legs joined into one polyline.
fn route_line(route: &Route) -> Vec<GeoPoint> {
    let mut line: Vec<GeoPoint> = Vec::new();
    for step in route.legs.iter().flat_map(|leg| leg.steps.iter()) {
        for &point in &step.geometry {
            match line.last() {
                Some(&last) if geometry::distance(last, point) < JOIN_EPSILON_METERS => {}
                _ => line.push(point),
            }
        }
    }
    line
}

#[derive(Debug, Clone, Copy)]
struct DrivePlan {
    speed: f64,
    interval_millis: i64,
    offset: f64,
    accuracy: Option<f64>,
}

impl DrivePlan {
    /// One sample per interval from the start of `line` to its end, inclusive.
    fn samples(&self, line: &[GeoPoint], start_millis: i64) -> Vec<PositionSample> {
        let total = geometry::line_length(line);
        let stride = self.speed * self.interval_millis as f64 / 1_000.0;

        let mut samples = Vec::new();
        let mut index = 0i64;
        loop {
            let along = (stride * index as f64).min(total);
            let Some(on_line) = geometry::point_along_line(line, along) else {
                break;
            };
            let bearing = geometry::project_onto_line(on_line, line)
                .and_then(|p| geometry::segment_bearing(line, p.segment_index))
                .unwrap_or(0.0);
            let point = if self.offset != 0.0 {
                geometry::destination(on_line, bearing + 90.0, self.offset)
            } else {
                on_line
            };

            let mut sample =
                PositionSample::at(point, start_millis + index * self.interval_millis)
                    .with_speed(self.speed)
                    .with_bearing(bearing)
                    .with_source(SIMULATED_SOURCE);
            if let Some(accuracy) = self.accuracy {
                sample = sample.with_accuracy(accuracy);
            }
            samples.push(sample);

            if along >= total {
                break;
            }
            index += 1;
        }
        samples
    }
}
