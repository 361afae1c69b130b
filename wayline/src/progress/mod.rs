//! Route progress snapshots.
//!
//! A [`RouteProgress`] is built per sample from the current route, the
//! session's leg/step indices and the sample position. It is immutable and
//! holds no hidden state: identical inputs produce identical snapshots.
//!
//! Index advancement is not decided here. The session advances indices after
//! evaluating a snapshot, so the change takes effect for the next sample.

mod builder;

pub use builder::build_progress;

use std::sync::Arc;

use thiserror::Error;

use crate::geometry::GeoPoint;
use crate::route::{Route, RouteIndices, RouteLeg, RouteStep};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgressError {
    #[error("indices {0} are outside the route")]
    InvalidIndices(RouteIndices),

    #[error("step at {0} has no geometry")]
    EmptyGeometry(RouteIndices),
}

/// Where the sample projected onto the current step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepProjection {
    pub point: GeoPoint,
    /// Distance from the sample to `point` (meters).
    pub distance_from_line: f64,
    pub segment_index: usize,
    /// Bearing of the segment holding `point`, if it has length.
    pub segment_bearing: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepProgress {
    pub step_index: usize,
    pub distance_remaining: f64,
    pub distance_traveled: f64,
    pub duration_remaining: f64,
    pub fraction_traveled: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegProgress {
    pub leg_index: usize,
    pub step_index: usize,
    pub distance_remaining: f64,
    pub duration_remaining: f64,
    pub fraction_traveled: f64,
}

/// Progress along a route for one sample.
#[derive(Debug, Clone)]
pub struct RouteProgress {
    route: Arc<Route>,
    pub indices: RouteIndices,
    /// Meters to the end of the route.
    pub distance_remaining: f64,
    /// Seconds to the end of the route.
    pub duration_remaining: f64,
    pub distance_traveled: f64,
    pub fraction_traveled: f64,
    pub leg_progress: LegProgress,
    pub step_progress: StepProgress,
    pub projection: StepProjection,
}

impl RouteProgress {
    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    #[inline]
    pub fn leg_index(&self) -> usize {
        self.indices.leg
    }

    #[inline]
    pub fn step_index(&self) -> usize {
        self.indices.step
    }

    pub fn current_leg(&self) -> Option<&RouteLeg> {
        self.route.legs.get(self.indices.leg)
    }

    pub fn current_step(&self) -> Option<&RouteStep> {
        self.route.step(self.indices)
    }

    /// Next step in this leg, or the first step of the next leg.
    pub fn upcoming_step(&self) -> Option<&RouteStep> {
        self.route.upcoming_step(self.indices)
    }

    /// Whether both snapshots were built against the same route instance.
    pub fn same_route(&self, other: &RouteProgress) -> bool {
        Arc::ptr_eq(&self.route, &other.route)
    }
}
