//! Per-session pipeline state.
//!
//! A [`NavigationSession`] owns everything that changes while a route is being
//! followed: the route itself, the leg/step indices, the off-route and
//! faster-route state, milestone flags and the previous progress snapshot.
//! Only the worker task touches it, one sample at a time.
//!
//! # Pipeline
//!
//! ```text
//! sample ─► validate ─► location filter ─► build progress ─► off-route verdict
//!        ─► advance indices (next sample) ─► milestones(previous, current)
//!        ─► snap ─► faster-route check ─► RouteUpdate
//! ```

use std::sync::Arc;

use crate::error::ProcessingError;
use crate::faster_route::{FasterRouteCheckState, FasterRouteChecker};
use crate::geometry;
use crate::milestone::{Milestone, MilestoneEvaluator};
use crate::off_route::{OffRouteDetector, OffRouteState, OffRouteVerdict};
use crate::options::NavigationOptions;
use crate::progress::{build_progress, RouteProgress};
use crate::route::{Route, RouteError, RouteIndices};
use crate::sample::{LocationFilter, PositionSample, SampleError, ROUTE_ORIGIN_SOURCE};

use super::{ProcessorError, RouteUpdate};

pub struct NavigationSession {
    route: Arc<Route>,
    options: NavigationOptions,
    indices: RouteIndices,
    filter: LocationFilter,
    detector: OffRouteDetector,
    faster_route: FasterRouteChecker,
    milestones: MilestoneEvaluator,
    previous: Option<RouteProgress>,
    sequence: u64,
}

impl NavigationSession {
    pub fn new(
        route: Arc<Route>,
        options: NavigationOptions,
        milestones: Vec<Milestone>,
    ) -> Result<Self, ProcessorError> {
        route.validate()?;
        options.validate()?;

        Ok(Self {
            filter: LocationFilter::new(options.location.clone()),
            detector: OffRouteDetector::new(&options),
            faster_route: FasterRouteChecker::new(),
            milestones: MilestoneEvaluator::new(milestones),
            route,
            options,
            indices: RouteIndices::default(),
            previous: None,
            sequence: 0,
        })
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    pub fn indices(&self) -> RouteIndices {
        self.indices
    }

    pub fn options(&self) -> &NavigationOptions {
        &self.options
    }

    pub fn previous_progress(&self) -> Option<&RouteProgress> {
        self.previous.as_ref()
    }

    pub fn off_route_state(&self) -> &OffRouteState {
        self.detector.state()
    }

    pub fn faster_route_state(&self) -> Option<&FasterRouteCheckState> {
        self.faster_route.state()
    }

    /// Number of updates produced so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Run one sample through the pipeline.
    pub fn process(&mut self, sample: PositionSample) -> Result<RouteUpdate, ProcessingError> {
        sample.validate()?;
        self.filter
            .check(&sample)
            .map_err(SampleError::Filtered)?;

        let progress = build_progress(&self.route, self.indices, sample.location())?;
        let verdict = self.detector.evaluate(&sample, &progress, &self.options);
        let off_route = verdict.is_off_route();

        self.advance_indices(verdict, &progress);

        let milestones = self.milestones.evaluate(self.previous.as_ref(), &progress);
        let location = self.snap(&sample, &progress, off_route);
        let check_faster_route =
            self.faster_route
                .should_check(&sample, &progress, off_route, &self.options);

        self.sequence += 1;
        self.previous = Some(progress.clone());

        tracing::debug!(
            sequence = self.sequence,
            verdict = %verdict,
            leg = progress.leg_index(),
            step = progress.step_index(),
            distance_remaining = progress.distance_remaining,
            milestones = milestones.len(),
            "Processed sample"
        );

        Ok(RouteUpdate {
            sequence: self.sequence,
            raw_location: sample,
            location,
            progress,
            milestones,
            off_route,
            check_faster_route,
        })
    }

    /// The sample to process first: `last_known` when usable, otherwise a
    /// synthetic sample at the route origin.
    pub fn initial_sample(&self, last_known: Option<PositionSample>, now_millis: i64) -> PositionSample {
        if let Some(sample) = last_known {
            if sample.validate().is_ok() {
                return sample;
            }
        }

        let origin = self
            .route
            .origin()
            .unwrap_or(geometry::GeoPoint::new(0.0, 0.0));
        let mut sample = PositionSample::at(origin, now_millis).with_source(ROUTE_ORIGIN_SOURCE);
        if let Some(bearing) = self
            .route
            .legs
            .first()
            .and_then(|leg| leg.steps.first())
            .and_then(|step| geometry::segment_bearing(&step.geometry, 0))
        {
            sample = sample.with_bearing(bearing);
        }
        sample
    }

    /// Replace the route and start over from its first step.
    pub fn apply_route(&mut self, route: Arc<Route>) -> Result<(), RouteError> {
        route.validate()?;

        self.route = route;
        self.indices = RouteIndices::default();
        self.detector.reset();
        self.faster_route.reset();
        self.milestones.reset();
        self.previous = None;

        tracing::info!(
            legs = self.route.legs.len(),
            distance = self.route.distance(),
            "Route replaced"
        );
        Ok(())
    }

    fn advance_indices(&mut self, verdict: OffRouteVerdict, progress: &RouteProgress) {
        let step_completed = verdict == OffRouteVerdict::OnRoute
            && progress.step_progress.distance_remaining <= self.options.step_completion_radius_meters;
        if !verdict.should_advance_step() && !step_completed {
            return;
        }

        let from = self.indices;
        if self.indices.advance(&self.route) {
            self.detector.reset();
            tracing::info!(from = %from, to = %self.indices, "Step advanced");
        }
    }

    fn snap(&self, sample: &PositionSample, progress: &RouteProgress, off_route: bool) -> PositionSample {
        if !self.options.snap_to_route || off_route {
            return sample.clone();
        }
        let snapped = sample.with_location(progress.projection.point);
        match progress.projection.segment_bearing {
            Some(bearing) => snapped.with_bearing(bearing),
            None => snapped,
        }
    }
}

impl std::fmt::Debug for NavigationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationSession")
            .field("indices", &self.indices)
            .field("sequence", &self.sequence)
            .field("milestones", &self.milestones.len())
            .finish_non_exhaustive()
    }
}
