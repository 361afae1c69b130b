//! Faster-route eligibility.
//!
//! Decides per sample whether a faster-route query should be issued. The
//! decision itself commits the cooldown window, so a slow fetch never causes
//! duplicate requests. The first eligible sample only seeds the window.
//!
//! ```text
//! disabled or off-route          -> false (state untouched)
//! no previous check              -> false, window seeded
//! elapsed >= interval AND
//!   moved >= min distance        -> true, window restarted
//! otherwise                      -> false
//! ```

use crate::geometry::{self, GeoPoint};
use crate::options::NavigationOptions;
use crate::progress::RouteProgress;
use crate::route::Route;
use crate::sample::PositionSample;

/// Where and when the last check was committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FasterRouteCheckState {
    pub last_check_timestamp: i64,
    pub last_check_location: GeoPoint,
}

#[derive(Debug, Default)]
pub struct FasterRouteChecker {
    state: Option<FasterRouteCheckState>,
}

impl FasterRouteChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<&FasterRouteCheckState> {
        self.state.as_ref()
    }

    pub fn should_check(
        &mut self,
        sample: &PositionSample,
        progress: &RouteProgress,
        off_route: bool,
        options: &NavigationOptions,
    ) -> bool {
        let faster = &options.faster_route;
        if !faster.enabled || off_route {
            return false;
        }

        let current = FasterRouteCheckState {
            last_check_timestamp: sample.timestamp_millis,
            last_check_location: sample.location(),
        };

        let Some(last) = self.state else {
            self.state = Some(current);
            return false;
        };

        let elapsed = sample.timestamp_millis - last.last_check_timestamp;
        if elapsed < faster.min_check_interval_millis {
            return false;
        }
        let moved = geometry::distance(last.last_check_location, sample.location());
        if moved < faster.min_distance_meters {
            return false;
        }

        self.state = Some(current);
        tracing::debug!(
            elapsed_ms = elapsed,
            moved_m = moved,
            duration_remaining = progress.duration_remaining,
            "Faster route: check due"
        );
        true
    }

    /// Whether `candidate` would arrive sooner than the current route.
    pub fn is_faster_route(&self, candidate: &Route, progress: &RouteProgress) -> bool {
        if candidate.validate().is_err() {
            return false;
        }
        candidate.duration() < progress.duration_remaining
    }

    /// Forget the last check (new route or session).
    pub fn reset(&mut self) {
        self.state = None;
    }
}
