//! Printing result batches.
//!
//! JSON output is one [`UpdateRecord`] per line on stdout. Text output is a
//! single human-readable line per update.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use clap::ValueEnum;
use serde::Serialize;
use wayline::geometry::GeoPoint;
use wayline::processor::{RouteUpdate, RouteUpdateListener};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line
    Json,
    /// Human-readable summary lines
    Text,
}

#[derive(Debug, Serialize)]
pub struct MilestoneRecord<'a> {
    pub identifier: u32,
    pub instruction: &'a str,
}

/// Serializable view of a [`RouteUpdate`].
#[derive(Debug, Serialize)]
pub struct UpdateRecord<'a> {
    /// Wall-clock time the update was printed (RFC 3339).
    pub emitted_at: String,
    pub sequence: u64,
    pub timestamp_millis: i64,
    pub raw_location: GeoPoint,
    pub location: GeoPoint,
    pub snapped: bool,
    pub leg: usize,
    pub step: usize,
    pub step_distance_remaining: f64,
    pub distance_remaining: f64,
    pub duration_remaining: f64,
    pub fraction_traveled: f64,
    pub off_route: bool,
    pub check_faster_route: bool,
    pub milestones: Vec<MilestoneRecord<'a>>,
}

impl<'a> UpdateRecord<'a> {
    pub fn new(update: &'a RouteUpdate) -> Self {
        let progress = &update.progress;
        Self {
            emitted_at: chrono::Local::now().to_rfc3339(),
            sequence: update.sequence,
            timestamp_millis: update.raw_location.timestamp_millis,
            raw_location: update.raw_location.location(),
            location: update.location.location(),
            snapped: update.is_snapped(),
            leg: progress.leg_index(),
            step: progress.step_index(),
            step_distance_remaining: progress.step_progress.distance_remaining,
            distance_remaining: progress.distance_remaining,
            duration_remaining: progress.duration_remaining,
            fraction_traveled: progress.fraction_traveled,
            off_route: update.off_route,
            check_faster_route: update.check_faster_route,
            milestones: update
                .milestones
                .iter()
                .map(|m| MilestoneRecord {
                    identifier: m.identifier,
                    instruction: &m.instruction,
                })
                .collect(),
        }
    }

    pub fn to_text(&self) -> String {
        let mut line = format!(
            "[{:>4}] leg {} step {} | step {:>6.0} m | route {:>7.0} m {:>5.0} s | {:>3.0}%",
            self.sequence,
            self.leg,
            self.step,
            self.step_distance_remaining,
            self.distance_remaining,
            self.duration_remaining,
            self.fraction_traveled * 100.0
        );
        if self.off_route {
            line.push_str(" | OFF ROUTE");
        }
        if self.check_faster_route {
            line.push_str(" | faster route check");
        }
        for milestone in &self.milestones {
            line.push_str(&format!(" | #{} \"{}\"", milestone.identifier, milestone.instruction));
        }
        line
    }
}

/// Listener printing every update to stdout and keeping session totals.
pub struct UpdatePrinter {
    format: OutputFormat,
    delivered: AtomicU64,
    off_route: AtomicU64,
    milestones: AtomicU64,
}

/// Totals reported at the end of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterTotals {
    pub delivered: u64,
    pub off_route: u64,
    pub milestones: u64,
}

impl UpdatePrinter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            delivered: AtomicU64::new(0),
            off_route: AtomicU64::new(0),
            milestones: AtomicU64::new(0),
        }
    }

    pub fn totals(&self) -> PrinterTotals {
        PrinterTotals {
            delivered: self.delivered.load(Ordering::Relaxed),
            off_route: self.off_route.load(Ordering::Relaxed),
            milestones: self.milestones.load(Ordering::Relaxed),
        }
    }

    fn write(&self, record: &UpdateRecord<'_>) -> std::io::Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut out, record)?;
                writeln!(out)
            }
            OutputFormat::Text => writeln!(out, "{}", record.to_text()),
        }
    }
}

impl RouteUpdateListener for UpdatePrinter {
    fn on_route_update(&self, update: &RouteUpdate) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        if update.off_route {
            self.off_route.fetch_add(1, Ordering::Relaxed);
        }
        self.milestones
            .fetch_add(update.milestones.len() as u64, Ordering::Relaxed);

        if let Err(e) = self.write(&UpdateRecord::new(update)) {
            tracing::warn!(sequence = update.sequence, error = %e, "Failed to write update");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wayline::geometry::destination;
    use wayline::milestone::FiredMilestone;
    use wayline::progress::build_progress;
    use wayline::route::{Route, RouteIndices, RouteLeg, RouteStep};
    use wayline::sample::PositionSample;

    fn update() -> RouteUpdate {
        let start = GeoPoint::new(48.85, 2.35);
        let end = destination(start, 90.0, 200.0);
        let route = Arc::new(Route::new(vec![RouteLeg::new(vec![
            RouteStep::from_geometry(vec![start, end], "depart", "Head east").with_duration(20.0),
        ])]));
        let sample = PositionSample::at(start, 1_000);
        RouteUpdate {
            sequence: 7,
            raw_location: sample.clone(),
            location: sample,
            progress: build_progress(&route, RouteIndices::default(), start).unwrap(),
            milestones: vec![FiredMilestone {
                identifier: 3,
                instruction: "Head east".to_string(),
            }],
            off_route: true,
            check_faster_route: false,
        }
    }

    #[test]
    fn test_json_record_fields() {
        let update = update();
        let value = serde_json::to_value(UpdateRecord::new(&update)).unwrap();

        assert_eq!(value["sequence"], 7);
        assert_eq!(value["timestamp_millis"], 1_000);
        assert_eq!(value["off_route"], true);
        assert_eq!(value["snapped"], false);
        assert_eq!(value["milestones"][0]["instruction"], "Head east");
        assert_eq!(value["raw_location"]["latitude"], 48.85);
        assert!(value["emitted_at"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_text_line() {
        let update = update();
        let line = UpdateRecord::new(&update).to_text();

        assert!(line.starts_with("[   7] leg 0 step 0"));
        assert!(line.contains("OFF ROUTE"));
        assert!(line.contains("#3 \"Head east\""));
        assert!(!line.contains("faster route"));
    }

    #[test]
    fn test_printer_totals() {
        let printer = UpdatePrinter::new(OutputFormat::Json);
        printer.on_route_update(&update());
        printer.on_route_update(&update());

        assert_eq!(
            printer.totals(),
            PrinterTotals {
                delivered: 2,
                off_route: 2,
                milestones: 2,
            }
        );
    }
}
