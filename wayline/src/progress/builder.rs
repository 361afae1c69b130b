//! Progress computation.

use std::sync::Arc;

use crate::geometry::{self, GeoPoint};
use crate::route::{Route, RouteIndices};

use super::{LegProgress, ProgressError, RouteProgress, StepProgress, StepProjection};

/// Build the progress snapshot for `location` on the step at `indices`.
///
/// The step remainder is measured along the step geometry from the projected
/// point. Leg and route remainders add the reported distance and duration of
/// every later step and leg. Durations are prorated by remaining distance.
pub fn build_progress(
    route: &Arc<Route>,
    indices: RouteIndices,
    location: GeoPoint,
) -> Result<RouteProgress, ProgressError> {
    let leg = route
        .legs
        .get(indices.leg)
        .ok_or(ProgressError::InvalidIndices(indices))?;
    let step = leg
        .steps
        .get(indices.step)
        .ok_or(ProgressError::InvalidIndices(indices))?;

    let projection = geometry::project_onto_line(location, &step.geometry)
        .ok_or(ProgressError::EmptyGeometry(indices))?;

    let step_remaining = geometry::remaining_along_line(&step.geometry, &projection);
    let step_duration_remaining = prorate(step.duration, step_remaining, step.distance);

    let later_steps = &leg.steps[indices.step + 1..];
    let leg_remaining = step_remaining + later_steps.iter().map(|s| s.distance).sum::<f64>();
    let leg_duration_remaining =
        step_duration_remaining + later_steps.iter().map(|s| s.duration).sum::<f64>();

    let later_legs = &route.legs[indices.leg + 1..];
    let route_remaining = leg_remaining + later_legs.iter().map(|l| l.distance()).sum::<f64>();
    let route_duration_remaining =
        leg_duration_remaining + later_legs.iter().map(|l| l.duration()).sum::<f64>();

    let total = route.distance();

    Ok(RouteProgress {
        route: Arc::clone(route),
        indices,
        distance_remaining: route_remaining,
        duration_remaining: route_duration_remaining,
        distance_traveled: (total - route_remaining).max(0.0),
        fraction_traveled: fraction(route_remaining, total),
        leg_progress: LegProgress {
            leg_index: indices.leg,
            step_index: indices.step,
            distance_remaining: leg_remaining,
            duration_remaining: leg_duration_remaining,
            fraction_traveled: fraction(leg_remaining, leg.distance()),
        },
        step_progress: StepProgress {
            step_index: indices.step,
            distance_remaining: step_remaining,
            distance_traveled: (step.distance - step_remaining).max(0.0),
            duration_remaining: step_duration_remaining,
            fraction_traveled: fraction(step_remaining, step.distance),
        },
        projection: StepProjection {
            point: projection.point,
            distance_from_line: projection.distance,
            segment_index: projection.segment_index,
            segment_bearing: geometry::segment_bearing(&step.geometry, projection.segment_index),
        },
    })
}

/// `1 - remaining / total`, clamped. A zero-length total counts as complete.
fn fraction(remaining: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 1.0;
    }
    (1.0 - remaining / total).clamp(0.0, 1.0)
}

fn prorate(duration: f64, remaining: f64, distance: f64) -> f64 {
    if distance <= 0.0 {
        return 0.0;
    }
    (duration * remaining / distance).clamp(0.0, duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{destination, point_along_line};
    use crate::route::fixtures::{city_route, two_leg_route, START};
    use proptest::prelude::*;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn test_progress_at_route_start() {
        let route = Arc::new(city_route());
        let progress = build_progress(&route, RouteIndices::default(), START).unwrap();

        assert!(close(progress.distance_remaining, route.distance(), 0.5));
        assert!(close(progress.fraction_traveled, 0.0, 1e-3));
        assert!(close(progress.step_progress.distance_remaining, 500.0, 0.5));
        assert!(close(progress.duration_remaining, 120.0, 0.1));
        assert_eq!(progress.projection.segment_index, 0);
    }

    #[test]
    fn test_progress_midway_through_first_step() {
        let route = Arc::new(city_route());
        let geometry = &route.legs[0].steps[0].geometry;
        let location = point_along_line(geometry, 200.0).unwrap();
        let progress = build_progress(&route, RouteIndices::default(), location).unwrap();

        assert!(close(progress.step_progress.distance_remaining, 300.0, 0.5));
        assert!(close(progress.step_progress.distance_traveled, 200.0, 0.5));
        assert!(close(progress.step_progress.fraction_traveled, 0.4, 1e-3));
        assert!(close(progress.step_progress.duration_remaining, 30.0, 0.1));
        assert!(close(progress.leg_progress.distance_remaining, 1_000.0, 1.0));
        assert!(close(progress.distance_traveled, 200.0, 1.0));
        assert!(close(progress.projection.segment_bearing.unwrap(), 90.0, 0.5));
    }

    #[test]
    fn test_off_line_sample_projects_onto_step() {
        let route = Arc::new(city_route());
        let on_line = point_along_line(&route.legs[0].steps[0].geometry, 250.0).unwrap();
        let off_line = destination(on_line, 0.0, 15.0);
        let progress = build_progress(&route, RouteIndices::default(), off_line).unwrap();

        assert!(close(progress.projection.distance_from_line, 15.0, 0.5));
        assert!(close(progress.step_progress.distance_remaining, 250.0, 1.0));
    }

    #[test]
    fn test_later_leg_excludes_earlier_distance() {
        let route = Arc::new(two_leg_route());
        let start_of_second = route.legs[1].steps[0].geometry[0];
        let progress = build_progress(&route, RouteIndices::new(1, 0), start_of_second).unwrap();

        assert!(close(progress.distance_remaining, route.legs[1].distance(), 0.5));
        assert!(close(progress.leg_progress.fraction_traveled, 0.0, 1e-3));
        assert!(progress.fraction_traveled > 0.3);
        assert_eq!(progress.leg_index(), 1);
        assert_eq!(progress.current_step().unwrap().maneuver.instruction, "Continue east");
        assert_eq!(progress.upcoming_step().unwrap().maneuver.instruction, "Turn right");
    }

    #[test]
    fn test_arrival_step_is_complete() {
        let route = Arc::new(city_route());
        let arrival = route.legs[0].steps[3].geometry[0];
        let progress = build_progress(&route, RouteIndices::new(0, 3), arrival).unwrap();

        assert_eq!(progress.distance_remaining, 0.0);
        assert_eq!(progress.fraction_traveled, 1.0);
        assert_eq!(progress.step_progress.fraction_traveled, 1.0);
        assert!(progress.upcoming_step().is_none());
    }

    #[test]
    fn test_invalid_indices() {
        let route = Arc::new(city_route());
        let err = build_progress(&route, RouteIndices::new(0, 9), START).unwrap_err();
        assert_eq!(err, ProgressError::InvalidIndices(RouteIndices::new(0, 9)));

        let err = build_progress(&route, RouteIndices::new(4, 0), START).unwrap_err();
        assert!(matches!(err, ProgressError::InvalidIndices(_)));
    }

    #[test]
    fn test_empty_geometry() {
        let mut route = city_route();
        route.legs[0].steps[1].geometry.clear();
        let route = Arc::new(route);
        let err = build_progress(&route, RouteIndices::new(0, 1), START).unwrap_err();
        assert_eq!(err, ProgressError::EmptyGeometry(RouteIndices::new(0, 1)));
    }

    #[test]
    fn test_deterministic() {
        let route = Arc::new(city_route());
        let location = destination(START, 45.0, 120.0);
        let a = build_progress(&route, RouteIndices::default(), location).unwrap();
        let b = build_progress(&route, RouteIndices::default(), location).unwrap();

        assert_eq!(a.distance_remaining, b.distance_remaining);
        assert_eq!(a.step_progress, b.step_progress);
        assert_eq!(a.projection, b.projection);
        assert!(a.same_route(&b));
    }

    proptest! {
        #[test]
        fn prop_remaining_decreases_along_step(a in 0.0f64..500.0, b in 0.0f64..500.0) {
            let route = Arc::new(city_route());
            let geometry = &route.legs[0].steps[0].geometry;
            let (near, far) = if a <= b { (a, b) } else { (b, a) };

            let first = build_progress(&route, RouteIndices::default(), point_along_line(geometry, near).unwrap()).unwrap();
            let second = build_progress(&route, RouteIndices::default(), point_along_line(geometry, far).unwrap()).unwrap();

            prop_assert!(second.distance_remaining <= first.distance_remaining + 1e-6);
            prop_assert!((0.0..=1.0).contains(&first.fraction_traveled));
        }
    }
}
