//! Navigation session options.
//!
//! Options are supplied once when a session is bound and are read by every
//! component in the pipeline. Changing them mid-session requires a rebind.
//!
//! # Example
//!
//! ```ignore
//! let options = NavigationOptions::default()
//!     .with_snap_to_route(false)
//!     .with_faster_route(FasterRouteOptions::default().with_enabled(true));
//! options.validate()?;
//! ```

use crate::config::ConfigError;

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Base distance from the step geometry still considered on-route (meters).
pub const DEFAULT_TOLERANCE_METERS: f64 = 20.0;

/// Largest bonus the reported horizontal accuracy may add to the tolerance (meters).
pub const DEFAULT_MAX_ACCURACY_BONUS_METERS: f64 = 30.0;

/// Radius around the upcoming maneuver that counts as having reached the next step.
pub const DEFAULT_MANEUVER_ZONE_RADIUS_METERS: f64 = 40.0;

/// Consecutive updates moving away from the maneuver before declaring off-route.
pub const DEFAULT_MOVING_AWAY_THRESHOLD: u32 = 5;

/// Initial search radius around the last reroute point (meters).
pub const DEFAULT_OFF_ROUTE_MINIMUM_DISTANCE_METERS: f64 = 50.0;

/// Multiplier applied to the search radius after every declaration.
pub const DEFAULT_RADIUS_GROWTH_RATE: f64 = 1.5;

/// Remaining step distance at which an on-route agent completes the step (meters).
pub const DEFAULT_STEP_COMPLETION_RADIUS_METERS: f64 = 5.0;

/// Minimum time between faster-route checks (5 minutes).
pub const DEFAULT_FASTER_ROUTE_INTERVAL_MILLIS: i64 = 300_000;

/// Minimum distance travelled between faster-route checks (meters).
pub const DEFAULT_FASTER_ROUTE_MIN_DISTANCE_METERS: f64 = 500.0;

/// Accuracy always accepted by the location filter (meters).
pub const DEFAULT_ACCEPTABLE_ACCURACY_METERS: f64 = 100.0;

/// Accuracy degradation tolerated relative to the last accepted sample (percent).
pub const DEFAULT_ACCURACY_PERCENT_THRESHOLD: f64 = 10.0;

/// Age after which the last accepted sample no longer constrains the next one.
pub const DEFAULT_STALE_AFTER_MILLIS: i64 = 5_000;

/// Highest implied velocity between accepted samples (meters/second).
pub const DEFAULT_MAX_VELOCITY_MPS: f64 = 100.0;

/// Samples less accurate than this never change off-route state (meters).
pub const DEFAULT_OFF_ROUTE_ACCURACY_CEILING_METERS: f64 = 200.0;

// ─────────────────────────────────────────────────────────────────────────────
// Off-route
// ─────────────────────────────────────────────────────────────────────────────

/// Thresholds for the off-route detector.
#[derive(Debug, Clone, PartialEq)]
pub struct OffRouteOptions {
    /// Base on-route tolerance around the step geometry (meters).
    pub tolerance_meters: f64,

    /// Cap on the accuracy-derived tolerance bonus (meters).
    ///
    /// The effective tolerance is `tolerance_meters + min(accuracy, cap)`.
    pub max_accuracy_bonus_meters: f64,

    /// Radius around the upcoming maneuver point (meters).
    pub maneuver_zone_radius_meters: f64,

    /// Consecutive away-from-maneuver updates needed to declare off-route.
    pub moving_away_threshold: u32,

    /// Search radius around the last reroute point right after a reroute (meters).
    pub minimum_distance_meters: f64,

    /// Growth factor of the search radius after each declaration.
    pub radius_growth_rate: f64,
}

impl Default for OffRouteOptions {
    fn default() -> Self {
        Self {
            tolerance_meters: DEFAULT_TOLERANCE_METERS,
            max_accuracy_bonus_meters: DEFAULT_MAX_ACCURACY_BONUS_METERS,
            maneuver_zone_radius_meters: DEFAULT_MANEUVER_ZONE_RADIUS_METERS,
            moving_away_threshold: DEFAULT_MOVING_AWAY_THRESHOLD,
            minimum_distance_meters: DEFAULT_OFF_ROUTE_MINIMUM_DISTANCE_METERS,
            radius_growth_rate: DEFAULT_RADIUS_GROWTH_RATE,
        }
    }
}

impl OffRouteOptions {
    pub fn with_tolerance(mut self, meters: f64) -> Self {
        self.tolerance_meters = meters;
        self
    }

    pub fn with_moving_away_threshold(mut self, count: u32) -> Self {
        self.moving_away_threshold = count;
        self
    }

    pub fn with_minimum_distance(mut self, meters: f64) -> Self {
        self.minimum_distance_meters = meters;
        self
    }

    pub fn with_radius_growth_rate(mut self, rate: f64) -> Self {
        self.radius_growth_rate = rate;
        self
    }

    /// Effective tolerance for a sample with the given horizontal accuracy.
    pub fn effective_tolerance(&self, accuracy: Option<f64>) -> f64 {
        let bonus = accuracy
            .unwrap_or(0.0)
            .max(0.0)
            .min(self.max_accuracy_bonus_meters);
        self.tolerance_meters + bonus
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Faster route
// ─────────────────────────────────────────────────────────────────────────────

/// Cooldown settings for faster-route checks.
#[derive(Debug, Clone, PartialEq)]
pub struct FasterRouteOptions {
    pub enabled: bool,
    pub min_check_interval_millis: i64,
    pub min_distance_meters: f64,
}

impl Default for FasterRouteOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            min_check_interval_millis: DEFAULT_FASTER_ROUTE_INTERVAL_MILLIS,
            min_distance_meters: DEFAULT_FASTER_ROUTE_MIN_DISTANCE_METERS,
        }
    }
}

impl FasterRouteOptions {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_min_check_interval_millis(mut self, millis: i64) -> Self {
        self.min_check_interval_millis = millis;
        self
    }

    pub fn with_min_distance(mut self, meters: f64) -> Self {
        self.min_distance_meters = meters;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Location accuracy
// ─────────────────────────────────────────────────────────────────────────────

/// Thresholds used to filter incoming samples and gate off-route decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationAccuracyThresholds {
    /// Samples at or below this accuracy pass the accuracy check (meters).
    pub acceptable_accuracy_meters: f64,

    /// Allowed accuracy degradation versus the last accepted sample (percent).
    pub accuracy_percent_threshold: f64,

    /// After this long without an accepted sample, the next one is always accepted.
    pub stale_after_millis: i64,

    /// Implied velocities above this are treated as jumps (meters/second).
    pub max_velocity_mps: f64,

    /// Accuracy beyond which off-route evaluation is inconclusive (meters).
    pub off_route_accuracy_ceiling_meters: f64,
}

impl Default for LocationAccuracyThresholds {
    fn default() -> Self {
        Self {
            acceptable_accuracy_meters: DEFAULT_ACCEPTABLE_ACCURACY_METERS,
            accuracy_percent_threshold: DEFAULT_ACCURACY_PERCENT_THRESHOLD,
            stale_after_millis: DEFAULT_STALE_AFTER_MILLIS,
            max_velocity_mps: DEFAULT_MAX_VELOCITY_MPS,
            off_route_accuracy_ceiling_meters: DEFAULT_OFF_ROUTE_ACCURACY_CEILING_METERS,
        }
    }
}

impl LocationAccuracyThresholds {
    pub fn with_off_route_accuracy_ceiling(mut self, meters: f64) -> Self {
        self.off_route_accuracy_ceiling_meters = meters;
        self
    }

    pub fn with_max_velocity(mut self, mps: f64) -> Self {
        self.max_velocity_mps = mps;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Navigation options
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable configuration for one navigation session.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationOptions {
    pub off_route: OffRouteOptions,
    pub faster_route: FasterRouteOptions,
    pub location: LocationAccuracyThresholds,

    /// Replace on-route samples with their projection onto the route.
    pub snap_to_route: bool,

    /// Remaining step distance at which the session moves to the next step.
    pub step_completion_radius_meters: f64,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            off_route: OffRouteOptions::default(),
            faster_route: FasterRouteOptions::default(),
            location: LocationAccuracyThresholds::default(),
            snap_to_route: true,
            step_completion_radius_meters: DEFAULT_STEP_COMPLETION_RADIUS_METERS,
        }
    }
}

impl NavigationOptions {
    pub fn with_off_route(mut self, off_route: OffRouteOptions) -> Self {
        self.off_route = off_route;
        self
    }

    pub fn with_faster_route(mut self, faster_route: FasterRouteOptions) -> Self {
        self.faster_route = faster_route;
        self
    }

    pub fn with_location(mut self, location: LocationAccuracyThresholds) -> Self {
        self.location = location;
        self
    }

    pub fn with_snap_to_route(mut self, enabled: bool) -> Self {
        self.snap_to_route = enabled;
        self
    }

    pub fn with_step_completion_radius(mut self, meters: f64) -> Self {
        self.step_completion_radius_meters = meters;
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("off_route.tolerance_meters", self.off_route.tolerance_meters)?;
        non_negative(
            "off_route.max_accuracy_bonus_meters",
            self.off_route.max_accuracy_bonus_meters,
        )?;
        non_negative(
            "off_route.maneuver_zone_radius_meters",
            self.off_route.maneuver_zone_radius_meters,
        )?;
        non_negative(
            "off_route.minimum_distance_meters",
            self.off_route.minimum_distance_meters,
        )?;
        if self.off_route.moving_away_threshold == 0 {
            return Err(ConfigError::invalid(
                "off_route.moving_away_threshold",
                "must be at least 1",
            ));
        }
        if !self.off_route.radius_growth_rate.is_finite() || self.off_route.radius_growth_rate < 1.0
        {
            return Err(ConfigError::invalid(
                "off_route.radius_growth_rate",
                format!("must be >= 1.0, got {}", self.off_route.radius_growth_rate),
            ));
        }
        if self.faster_route.min_check_interval_millis < 0 {
            return Err(ConfigError::invalid(
                "faster_route.min_check_interval_millis",
                "must not be negative",
            ));
        }
        non_negative(
            "faster_route.min_distance_meters",
            self.faster_route.min_distance_meters,
        )?;
        non_negative(
            "location.acceptable_accuracy_meters",
            self.location.acceptable_accuracy_meters,
        )?;
        non_negative(
            "location.accuracy_percent_threshold",
            self.location.accuracy_percent_threshold,
        )?;
        if self.location.stale_after_millis < 0 {
            return Err(ConfigError::invalid(
                "location.stale_after_millis",
                "must not be negative",
            ));
        }
        positive("location.max_velocity_mps", self.location.max_velocity_mps)?;
        positive(
            "location.off_route_accuracy_ceiling_meters",
            self.location.off_route_accuracy_ceiling_meters,
        )?;
        non_negative(
            "step_completion_radius_meters",
            self.step_completion_radius_meters,
        )
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be a non-negative number, got {}", value),
        ))
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be a positive number, got {}", value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = NavigationOptions::default();
        assert_eq!(options.off_route.tolerance_meters, 20.0);
        assert_eq!(options.off_route.moving_away_threshold, 5);
        assert_eq!(options.off_route.minimum_distance_meters, 50.0);
        assert!(options.snap_to_route);
        assert!(!options.faster_route.enabled);
        assert_eq!(options.faster_route.min_check_interval_millis, 300_000);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_effective_tolerance_is_capped() {
        let options = OffRouteOptions::default();
        assert_eq!(options.effective_tolerance(None), 20.0);
        assert_eq!(options.effective_tolerance(Some(10.0)), 30.0);
        assert_eq!(options.effective_tolerance(Some(300.0)), 50.0);
        assert_eq!(options.effective_tolerance(Some(-4.0)), 20.0);
    }

    #[test]
    fn test_builders() {
        let options = NavigationOptions::default()
            .with_snap_to_route(false)
            .with_step_completion_radius(8.0)
            .with_off_route(OffRouteOptions::default().with_moving_away_threshold(3))
            .with_faster_route(FasterRouteOptions::default().with_enabled(true));

        assert!(!options.snap_to_route);
        assert_eq!(options.step_completion_radius_meters, 8.0);
        assert_eq!(options.off_route.moving_away_threshold, 3);
        assert!(options.faster_route.enabled);
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let options = NavigationOptions::default()
            .with_off_route(OffRouteOptions::default().with_moving_away_threshold(0));
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("moving_away_threshold"));
    }

    #[test]
    fn test_validate_rejects_shrinking_radius() {
        let options = NavigationOptions::default()
            .with_off_route(OffRouteOptions::default().with_radius_growth_rate(0.5));
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_tolerance() {
        let options =
            NavigationOptions::default().with_off_route(OffRouteOptions::default().with_tolerance(-1.0));
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut options = NavigationOptions::default();
        options.location.max_velocity_mps = f64::NAN;
        assert!(options.validate().is_err());
    }
}
