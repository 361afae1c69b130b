//! Off-route detection.
//!
//! Decides per sample whether the agent has left the route. A single far-away
//! fix is not enough: the detector only declares off-route after a run of
//! consecutive updates moving away from the current maneuver, and it will not
//! declare again while the agent is still inside the (growing) search radius
//! around the last reroute point.
//!
//! "Moving away" compares straight-line distances from the sample to the
//! maneuver that ends the current step (the end of the step on the final
//! step), so overshooting a turn counts as well as leaving the line sideways.
//!
//! # Evaluation Order
//!
//! ```text
//! distance_remaining <= 0                      -> OffRoute
//! accuracy > ceiling                           -> Inconclusive(LowAccuracy)
//! step geometry without a segment              -> Inconclusive(DegenerateGeometry)
//! distance to step <= tolerance(accuracy)      -> OnRoute
//! within maneuver zone of the upcoming step    -> AdvanceStep
//! away count reaches threshold, outside radius -> OffRoute
//! away count reaches threshold, inside radius  -> Suppressed
//! otherwise                                    -> Drifting
//! ```

mod detector;

pub use detector::OffRouteDetector;

use crate::geometry::GeoPoint;

/// Hysteresis state owned by the detector for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct OffRouteState {
    /// Timestamp of the last off-route declaration (epoch millis).
    pub last_off_route_timestamp: Option<i64>,

    /// Consecutive updates that moved away from the current maneuver.
    pub consecutive_away_count: u32,

    /// Where off-route was last declared.
    pub last_reroute_location: Option<GeoPoint>,

    /// Radius around `last_reroute_location` inside which declarations are
    /// suppressed (meters).
    pub current_search_radius: f64,

    /// Straight-line distance to the maneuver on the previous away-check, the
    /// baseline for "moving away" comparisons.
    pub last_distance_to_maneuver: Option<f64>,
}

impl OffRouteState {
    pub fn new(minimum_distance: f64) -> Self {
        Self {
            last_off_route_timestamp: None,
            consecutive_away_count: 0,
            last_reroute_location: None,
            current_search_radius: minimum_distance,
            last_distance_to_maneuver: None,
        }
    }
}

/// Why a sample could not be judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InconclusiveReason {
    LowAccuracy,
    DegenerateGeometry,
}

/// Outcome of one off-route evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffRouteVerdict {
    /// Consistent with the current step.
    OnRoute,
    /// Already at the upcoming maneuver; the step index should advance.
    AdvanceStep,
    /// Beyond tolerance, but not (yet) off-route.
    Drifting,
    /// Off-route declared.
    OffRoute,
    /// Would have been declared, but the agent is still near the last reroute point.
    Suppressed,
    /// No decision either way; state untouched.
    Inconclusive(InconclusiveReason),
}

impl OffRouteVerdict {
    #[inline]
    pub fn is_off_route(&self) -> bool {
        matches!(self, OffRouteVerdict::OffRoute)
    }

    #[inline]
    pub fn should_advance_step(&self) -> bool {
        matches!(self, OffRouteVerdict::AdvanceStep)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OffRouteVerdict::OnRoute => "on-route",
            OffRouteVerdict::AdvanceStep => "advance-step",
            OffRouteVerdict::Drifting => "drifting",
            OffRouteVerdict::OffRoute => "off-route",
            OffRouteVerdict::Suppressed => "suppressed",
            OffRouteVerdict::Inconclusive(InconclusiveReason::LowAccuracy) => "inconclusive (accuracy)",
            OffRouteVerdict::Inconclusive(InconclusiveReason::DegenerateGeometry) => {
                "inconclusive (geometry)"
            }
        }
    }
}

impl std::fmt::Display for OffRouteVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
