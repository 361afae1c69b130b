//! The off-route detector.

use crate::geometry;
use crate::options::NavigationOptions;
use crate::progress::RouteProgress;
use crate::sample::PositionSample;

use super::{InconclusiveReason, OffRouteState, OffRouteVerdict};

/// Stateful off-route detector, one per session.
///
/// The detector reads the route only through the progress passed to each
/// call, so the same instance keeps working across reroutes once
/// [`reset`](Self::reset) has been called.
#[derive(Debug)]
pub struct OffRouteDetector {
    state: OffRouteState,
}

impl OffRouteDetector {
    pub fn new(options: &NavigationOptions) -> Self {
        Self {
            state: OffRouteState::new(options.off_route.minimum_distance_meters),
        }
    }

    pub fn state(&self) -> &OffRouteState {
        &self.state
    }

    /// Shorthand for `evaluate(..).is_off_route()`.
    pub fn is_off_route(
        &mut self,
        sample: &PositionSample,
        progress: &RouteProgress,
        options: &NavigationOptions,
    ) -> bool {
        self.evaluate(sample, progress, options).is_off_route()
    }

    /// Evaluate one sample against the progress built for it.
    pub fn evaluate(
        &mut self,
        sample: &PositionSample,
        progress: &RouteProgress,
        options: &NavigationOptions,
    ) -> OffRouteVerdict {
        if progress.distance_remaining <= 0.0 {
            tracing::debug!(
                leg = progress.leg_index(),
                step = progress.step_index(),
                "Off-route detector: no distance remaining"
            );
            return OffRouteVerdict::OffRoute;
        }

        if let Some(accuracy) = sample.horizontal_accuracy {
            if accuracy > options.location.off_route_accuracy_ceiling_meters {
                tracing::debug!(accuracy, "Off-route detector: accuracy too low, skipping");
                return OffRouteVerdict::Inconclusive(InconclusiveReason::LowAccuracy);
            }
        }

        let Some(step) = progress.current_step() else {
            return OffRouteVerdict::Inconclusive(InconclusiveReason::DegenerateGeometry);
        };
        if !geometry::has_extent(&step.geometry) {
            return OffRouteVerdict::Inconclusive(InconclusiveReason::DegenerateGeometry);
        }
        let Some(projection) = geometry::project_onto_line(sample.location(), &step.geometry) else {
            return OffRouteVerdict::Inconclusive(InconclusiveReason::DegenerateGeometry);
        };
        // The maneuver ending this step: the upcoming step's, or the end of the
        // final step.
        let maneuver = progress
            .upcoming_step()
            .map(|upcoming| upcoming.maneuver.location)
            .or_else(|| step.geometry.last().copied());
        let Some(maneuver) = maneuver else {
            return OffRouteVerdict::Inconclusive(InconclusiveReason::DegenerateGeometry);
        };
        let distance_to_maneuver = geometry::distance(sample.location(), maneuver);

        let off_route = &options.off_route;
        let tolerance = off_route.effective_tolerance(sample.horizontal_accuracy);

        if projection.distance <= tolerance {
            self.state.consecutive_away_count = 0;
            self.state.current_search_radius = off_route.minimum_distance_meters;
            self.state.last_distance_to_maneuver = Some(distance_to_maneuver);
            return OffRouteVerdict::OnRoute;
        }

        if let Some(upcoming) = progress.upcoming_step() {
            let to_upcoming = geometry::distance(sample.location(), upcoming.maneuver.location);
            if to_upcoming <= off_route.maneuver_zone_radius_meters {
                tracing::debug!(
                    distance = to_upcoming,
                    "Off-route detector: at upcoming maneuver, advancing step"
                );
                self.state.consecutive_away_count = 0;
                self.state.last_distance_to_maneuver = None;
                return OffRouteVerdict::AdvanceStep;
            }
        }

        match self.state.last_distance_to_maneuver {
            Some(previous) if distance_to_maneuver > previous => {
                self.state.consecutive_away_count += 1;
            }
            _ => self.state.consecutive_away_count = 0,
        }
        self.state.last_distance_to_maneuver = Some(distance_to_maneuver);

        tracing::debug!(
            distance_from_route = projection.distance,
            tolerance,
            away_count = self.state.consecutive_away_count,
            "Off-route detector: sample beyond tolerance"
        );

        if self.state.consecutive_away_count < off_route.moving_away_threshold {
            return OffRouteVerdict::Drifting;
        }

        if let Some(anchor) = self.state.last_reroute_location {
            let from_anchor = geometry::distance(sample.location(), anchor);
            if from_anchor < self.state.current_search_radius {
                tracing::debug!(
                    from_anchor,
                    radius = self.state.current_search_radius,
                    "Off-route detector: near last reroute point, suppressing"
                );
                return OffRouteVerdict::Suppressed;
            }
        }

        self.state.last_reroute_location = Some(sample.location());
        self.state.last_off_route_timestamp = Some(sample.timestamp_millis);
        self.state.consecutive_away_count = 0;
        self.state.last_distance_to_maneuver = None;
        self.state.current_search_radius *= off_route.radius_growth_rate;

        tracing::info!(
            location = %sample.location(),
            leg = progress.leg_index(),
            step = progress.step_index(),
            distance_from_route = projection.distance,
            next_radius = self.state.current_search_radius,
            "Off-route detector: off-route declared"
        );

        OffRouteVerdict::OffRoute
    }

    /// Clear hysteresis after a reroute. The reroute anchor and search radius
    /// are kept.
    pub fn reset(&mut self) {
        self.state.consecutive_away_count = 0;
        self.state.last_distance_to_maneuver = None;
    }
}
