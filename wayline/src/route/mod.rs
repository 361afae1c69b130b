//! Route model: legs made of steps, each step with its own geometry.
//!
//! A [`Route`] is immutable once fetched and is shared between the session and
//! every progress snapshot through an `Arc`. Reroutes replace it wholesale.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{self, GeoPoint};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("route has no legs")]
    NoLegs,

    #[error("leg {leg} has no steps")]
    EmptyLeg { leg: usize },

    #[error("step {step} of leg {leg} has no geometry")]
    EmptyGeometry { leg: usize, step: usize },

    #[error("step {step} of leg {leg} has an invalid point {point}")]
    InvalidPoint { leg: usize, step: usize, point: GeoPoint },

    #[error("step {step} of leg {leg} has invalid {field} {value}")]
    InvalidMeasure {
        leg: usize,
        step: usize,
        field: &'static str,
        value: f64,
    },
}

/// The action to perform at the start of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    pub location: GeoPoint,
    #[serde(default)]
    pub instruction: String,
    /// Maneuver type, e.g. "turn", "depart", "arrive".
    #[serde(default)]
    pub kind: String,
}

impl Maneuver {
    pub fn new(location: GeoPoint, kind: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            location,
            instruction: instruction.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub geometry: Vec<GeoPoint>,
    pub maneuver: Maneuver,
    /// Meters.
    pub distance: f64,
    /// Seconds.
    #[serde(default)]
    pub duration: f64,
    /// Road name.
    #[serde(default)]
    pub name: String,
}

impl RouteStep {
    /// Step whose distance is the length of its geometry and whose maneuver
    /// sits on its first point.
    pub fn from_geometry(geometry: Vec<GeoPoint>, kind: &str, instruction: &str) -> Self {
        let location = geometry.first().copied().unwrap_or(GeoPoint::new(0.0, 0.0));
        Self {
            distance: geometry::line_length(&geometry),
            geometry,
            maneuver: Maneuver::new(location, kind, instruction),
            duration: 0.0,
            name: String::new(),
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = seconds;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub steps: Vec<RouteStep>,
    #[serde(default)]
    pub summary: String,
}

impl RouteLeg {
    pub fn new(steps: Vec<RouteStep>) -> Self {
        Self {
            steps,
            summary: String::new(),
        }
    }

    pub fn distance(&self) -> f64 {
        self.steps.iter().map(|s| s.distance).sum()
    }

    pub fn duration(&self) -> f64 {
        self.steps.iter().map(|s| s.duration).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub legs: Vec<RouteLeg>,
}

impl Route {
    pub fn new(legs: Vec<RouteLeg>) -> Self {
        Self { legs }
    }

    /// Total distance in meters.
    pub fn distance(&self) -> f64 {
        self.legs.iter().map(RouteLeg::distance).sum()
    }

    /// Total duration in seconds.
    pub fn duration(&self) -> f64 {
        self.legs.iter().map(RouteLeg::duration).sum()
    }

    /// First point of the first step.
    pub fn origin(&self) -> Option<GeoPoint> {
        self.legs.first()?.steps.first()?.geometry.first().copied()
    }

    pub fn step(&self, indices: RouteIndices) -> Option<&RouteStep> {
        self.legs.get(indices.leg)?.steps.get(indices.step)
    }

    /// The step after `indices`, rolling into the next leg.
    pub fn upcoming_step(&self, indices: RouteIndices) -> Option<&RouteStep> {
        let mut next = indices;
        if next.advance(self) {
            self.step(next)
        } else {
            None
        }
    }

    /// Reject routes the progress builder cannot work with.
    pub fn validate(&self) -> Result<(), RouteError> {
        if self.legs.is_empty() {
            return Err(RouteError::NoLegs);
        }
        for (leg_index, leg) in self.legs.iter().enumerate() {
            if leg.steps.is_empty() {
                return Err(RouteError::EmptyLeg { leg: leg_index });
            }
            for (step_index, step) in leg.steps.iter().enumerate() {
                if step.geometry.is_empty() {
                    return Err(RouteError::EmptyGeometry {
                        leg: leg_index,
                        step: step_index,
                    });
                }
                if let Some(point) = step
                    .geometry
                    .iter()
                    .chain(std::iter::once(&step.maneuver.location))
                    .find(|p| !p.is_valid())
                {
                    return Err(RouteError::InvalidPoint {
                        leg: leg_index,
                        step: step_index,
                        point: *point,
                    });
                }
                for (field, value) in [("distance", step.distance), ("duration", step.duration)] {
                    if !value.is_finite() || value < 0.0 {
                        return Err(RouteError::InvalidMeasure {
                            leg: leg_index,
                            step: step_index,
                            field,
                            value,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Position of the session within a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteIndices {
    pub leg: usize,
    pub step: usize,
}

impl RouteIndices {
    pub fn new(leg: usize, step: usize) -> Self {
        Self { leg, step }
    }

    /// Move to the next step, rolling into the next leg. Returns `false` (and
    /// stays put) at the final step of the final leg.
    pub fn advance(&mut self, route: &Route) -> bool {
        let Some(leg) = route.legs.get(self.leg) else {
            return false;
        };
        if self.step + 1 < leg.steps.len() {
            self.step += 1;
            return true;
        }
        if self.leg + 1 < route.legs.len() {
            self.leg += 1;
            self.step = 0;
            return true;
        }
        false
    }

    /// Whether these indices point at the final step of the final leg.
    pub fn is_final(&self, route: &Route) -> bool {
        let mut next = *self;
        !next.advance(route)
    }
}

impl std::fmt::Display for RouteIndices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "leg {} step {}", self.leg, self.step)
    }
}

/// Hand-built routes shared by unit tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::geometry::destination;

    pub const START: GeoPoint = GeoPoint {
        latitude: 38.9,
        longitude: -77.04,
    };

    /// Polyline from `start` along `bearing`, one vertex every 100 m.
    pub fn straight(start: GeoPoint, bearing: f64, length: f64) -> Vec<GeoPoint> {
        let segments = (length / 100.0).ceil().max(1.0) as usize;
        (0..=segments)
            .map(|i| destination(start, bearing, length * i as f64 / segments as f64))
            .collect()
    }

    /// One leg: 500 m east, 400 m north, 300 m east, then arrival.
    /// Each step takes 10 m/s.
    pub fn city_route() -> Route {
        let east = straight(START, 90.0, 500.0);
        let north = straight(*east.last().unwrap(), 0.0, 400.0);
        let east_again = straight(*north.last().unwrap(), 90.0, 300.0);
        let arrival = vec![*east_again.last().unwrap()];

        let steps = vec![
            RouteStep::from_geometry(east, "depart", "Head east").with_duration(50.0),
            RouteStep::from_geometry(north, "turn", "Turn left").with_duration(40.0),
            RouteStep::from_geometry(east_again, "turn", "Turn right").with_duration(30.0),
            RouteStep::from_geometry(arrival, "arrive", "You have arrived"),
        ];
        Route::new(vec![RouteLeg::new(steps)])
    }

    /// Two legs of two steps each.
    pub fn two_leg_route() -> Route {
        let a = straight(START, 90.0, 300.0);
        let b = straight(*a.last().unwrap(), 0.0, 200.0);
        let c = straight(*b.last().unwrap(), 90.0, 300.0);
        let d = straight(*c.last().unwrap(), 180.0, 200.0);
        Route::new(vec![
            RouteLeg::new(vec![
                RouteStep::from_geometry(a, "depart", "Head east").with_duration(30.0),
                RouteStep::from_geometry(b, "turn", "Turn left").with_duration(20.0),
            ]),
            RouteLeg::new(vec![
                RouteStep::from_geometry(c, "depart", "Continue east").with_duration(30.0),
                RouteStep::from_geometry(d, "turn", "Turn right").with_duration(20.0),
            ]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_totals() {
        let route = city_route();
        assert!((route.distance() - 1_200.0).abs() < 1.0, "got {}", route.distance());
        assert_eq!(route.duration(), 120.0);
        assert_eq!(route.origin(), Some(START));
    }

    #[test]
    fn test_validate_accepts_fixture() {
        assert!(city_route().validate().is_ok());
        assert!(two_leg_route().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_pieces() {
        assert_eq!(Route::new(vec![]).validate(), Err(RouteError::NoLegs));
        assert_eq!(
            Route::new(vec![RouteLeg::new(vec![])]).validate(),
            Err(RouteError::EmptyLeg { leg: 0 })
        );

        let mut route = city_route();
        route.legs[0].steps[2].geometry.clear();
        assert_eq!(
            route.validate(),
            Err(RouteError::EmptyGeometry { leg: 0, step: 2 })
        );
    }

    #[test]
    fn test_validate_rejects_negative_distance() {
        let mut route = city_route();
        route.legs[0].steps[1].distance = -3.0;
        assert!(matches!(
            route.validate(),
            Err(RouteError::InvalidMeasure { field: "distance", .. })
        ));
    }

    #[test]
    fn test_advance_within_leg() {
        let route = city_route();
        let mut indices = RouteIndices::default();
        assert!(indices.advance(&route));
        assert_eq!(indices, RouteIndices::new(0, 1));
    }

    #[test]
    fn test_advance_rolls_into_next_leg() {
        let route = two_leg_route();
        let mut indices = RouteIndices::new(0, 1);
        assert!(indices.advance(&route));
        assert_eq!(indices, RouteIndices::new(1, 0));
    }

    #[test]
    fn test_advance_stops_at_final_step() {
        let route = two_leg_route();
        let mut indices = RouteIndices::new(1, 1);
        assert!(indices.is_final(&route));
        assert!(!indices.advance(&route));
        assert_eq!(indices, RouteIndices::new(1, 1));
    }

    #[test]
    fn test_upcoming_step() {
        let route = two_leg_route();
        let upcoming = route.upcoming_step(RouteIndices::new(0, 1)).unwrap();
        assert_eq!(upcoming.maneuver.instruction, "Continue east");
        assert!(route.upcoming_step(RouteIndices::new(1, 1)).is_none());
    }

    #[test]
    fn test_json_round_trip_defaults() {
        let json = r#"{"legs":[{"steps":[{"geometry":[{"latitude":1.0,"longitude":2.0}],
            "maneuver":{"location":{"latitude":1.0,"longitude":2.0}},"distance":0.0}]}]}"#;
        let route: Route = serde_json::from_str(json).unwrap();
        assert!(route.validate().is_ok());
        assert_eq!(route.legs[0].steps[0].duration, 0.0);
        assert!(route.legs[0].summary.is_empty());
    }
}
