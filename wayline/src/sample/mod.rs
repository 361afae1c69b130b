//! Position samples delivered by the location source.
//!
//! A [`PositionSample`] is immutable once created. The worker consumes each
//! sample exactly once; derived positions (snapping) are new samples built
//! with [`PositionSample::with_location`].

mod filter;

pub use filter::{FilterRejection, LocationFilter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::GeoPoint;

/// Source id used for samples synthesized from the route origin.
pub const ROUTE_ORIGIN_SOURCE: &str = "route-origin";

/// Reasons a sample cannot be processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("invalid {field}: {value}")]
    InvalidField { field: &'static str, value: f64 },

    #[error("sample rejected by location filter: {0}")]
    Filtered(FilterRejection),
}

/// A timestamped position fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Unix epoch milliseconds.
    pub timestamp_millis: i64,
    /// Meters per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Degrees clockwise from true north.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
    /// Meters above the ellipsoid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Radius of 68% confidence in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_accuracy: Option<f64>,
    #[serde(default)]
    pub source_id: String,
}

impl PositionSample {
    /// Create a sample with only a position and a timestamp.
    pub fn new(latitude: f64, longitude: f64, timestamp_millis: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_millis,
            speed: None,
            bearing: None,
            altitude: None,
            horizontal_accuracy: None,
            source_id: String::new(),
        }
    }

    pub fn at(point: GeoPoint, timestamp_millis: i64) -> Self {
        Self::new(point.latitude, point.longitude, timestamp_millis)
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.horizontal_accuracy = Some(meters);
        self
    }

    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }

    /// Copy of this sample moved to `point`, all other fields kept.
    pub fn with_location(&self, point: GeoPoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            ..self.clone()
        }
    }

    #[inline]
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Check coordinates and the optional measurements.
    pub fn validate(&self) -> Result<(), SampleError> {
        if !self.location().is_valid() {
            return Err(SampleError::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }
        check_optional("horizontal_accuracy", self.horizontal_accuracy, |v| v >= 0.0)?;
        check_optional("speed", self.speed, |v| v >= 0.0)?;
        check_optional("bearing", self.bearing, |_| true)?;
        check_optional("altitude", self.altitude, |_| true)?;
        Ok(())
    }
}

fn check_optional(
    field: &'static str,
    value: Option<f64>,
    accept: impl Fn(f64) -> bool,
) -> Result<(), SampleError> {
    match value {
        Some(v) if !v.is_finite() || !accept(v) => Err(SampleError::InvalidField { field, value: v }),
        _ => Ok(()),
    }
}
