//! Location filter.
//!
//! Drops samples that would only add noise before they reach any computation:
//! fixes much less accurate than the previous accepted one, and jumps that
//! imply an impossible velocity. The first sample is always accepted, and so
//! is any sample arriving after the last accepted one has gone stale.

use crate::geometry;
use crate::options::LocationAccuracyThresholds;

use super::PositionSample;

/// Why the filter rejected a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterRejection {
    /// Timestamp earlier than the last accepted sample.
    OutOfOrder { timestamp_millis: i64, last_millis: i64 },
    /// Accuracy too poor, both absolutely and relative to the last sample.
    Accuracy { accuracy: f64, limit: f64 },
    /// Implied speed from the last accepted sample is implausible.
    Velocity { mps: f64, limit: f64 },
}

impl std::fmt::Display for FilterRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterRejection::OutOfOrder {
                timestamp_millis,
                last_millis,
            } => write!(f, "timestamp {} precedes {}", timestamp_millis, last_millis),
            FilterRejection::Accuracy { accuracy, limit } => {
                write!(f, "accuracy {:.1}m exceeds {:.1}m", accuracy, limit)
            }
            FilterRejection::Velocity { mps, limit } => {
                write!(f, "implied velocity {:.1}m/s exceeds {:.1}m/s", mps, limit)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Accepted {
    location: geometry::GeoPoint,
    timestamp_millis: i64,
    accuracy: Option<f64>,
}

/// Stateful sample filter, one per session.
#[derive(Debug)]
pub struct LocationFilter {
    thresholds: LocationAccuracyThresholds,
    last: Option<Accepted>,
}

impl LocationFilter {
    pub fn new(thresholds: LocationAccuracyThresholds) -> Self {
        Self {
            thresholds,
            last: None,
        }
    }

    /// Decide whether `sample` should be processed. Accepted samples become
    /// the new reference.
    pub fn check(&mut self, sample: &PositionSample) -> Result<(), FilterRejection> {
        let current = Accepted {
            location: sample.location(),
            timestamp_millis: sample.timestamp_millis,
            accuracy: sample.horizontal_accuracy,
        };

        let Some(last) = self.last else {
            self.last = Some(current);
            return Ok(());
        };

        let elapsed = sample.timestamp_millis - last.timestamp_millis;
        if elapsed < 0 {
            return Err(FilterRejection::OutOfOrder {
                timestamp_millis: sample.timestamp_millis,
                last_millis: last.timestamp_millis,
            });
        }

        if elapsed > self.thresholds.stale_after_millis {
            self.last = Some(current);
            return Ok(());
        }

        if let Some(accuracy) = sample.horizontal_accuracy {
            if accuracy > self.thresholds.acceptable_accuracy_meters {
                let limit = match last.accuracy {
                    Some(previous) => previous * (1.0 + self.thresholds.accuracy_percent_threshold / 100.0),
                    None => self.thresholds.acceptable_accuracy_meters,
                };
                if accuracy > limit {
                    return Err(FilterRejection::Accuracy { accuracy, limit });
                }
            }
        }

        let moved = geometry::distance(last.location, current.location);
        if moved > 0.0 {
            let mps = if elapsed == 0 {
                f64::INFINITY
            } else {
                moved / (elapsed as f64 / 1000.0)
            };
            if mps > self.thresholds.max_velocity_mps {
                return Err(FilterRejection::Velocity {
                    mps,
                    limit: self.thresholds.max_velocity_mps,
                });
            }
        }

        self.last = Some(current);
        Ok(())
    }

    /// Forget the reference sample.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
