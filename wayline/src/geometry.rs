//! Geometry utilities for route matching.
//!
//! Pure functions, no state. Distances are great-circle (haversine) meters and
//! bearings are degrees clockwise from true north in the range 0-360.
//!
//! # Projection
//!
//! Projecting a position onto a polyline is done segment by segment: the closest
//! point on each segment is found in longitude/latitude space and then measured
//! with haversine. Step geometry is made of short segments, so the planar
//! approximation does not move the projected point in any meaningful way, while
//! the reported distances stay true meters.
//!
//! ```ignore
//! let line = vec![GeoPoint::new(38.9, -77.05), GeoPoint::new(38.9, -77.04)];
//! let projection = project_onto_line(sample.location(), &line).unwrap();
//! let to_end = remaining_along_line(&line, &projection);
//! ```

use geo::{Bearing, Closest, ClosestPoint, Destination, Distance, Haversine, Line, Point};
use serde::{Deserialize, Serialize};

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point from latitude and longitude in degrees.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Convert to a `geo` point (x = longitude, y = latitude).
    #[inline]
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// Whether both coordinates are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<Point<f64>> for GeoPoint {
    fn from(point: Point<f64>) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Great-circle distance between two points in meters.
#[inline]
pub fn distance(from: GeoPoint, to: GeoPoint) -> f64 {
    Haversine.distance(from.to_point(), to.to_point())
}

/// Initial bearing from `from` to `to` in degrees (0-360).
pub fn bearing(from: GeoPoint, to: GeoPoint) -> f64 {
    Haversine
        .bearing(from.to_point(), to.to_point())
        .rem_euclid(360.0)
}

/// The point reached by travelling `distance_m` meters from `origin` on the
/// given bearing.
pub fn destination(origin: GeoPoint, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    Haversine
        .destination(origin.to_point(), bearing_deg, distance_m)
        .into()
}

/// Smallest absolute difference between two bearings in degrees (0-180).
pub fn bearing_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Total length of a polyline in meters.
pub fn line_length(line: &[GeoPoint]) -> f64 {
    line.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// Result of projecting a point onto a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineProjection {
    /// Nearest point on the line.
    pub point: GeoPoint,
    /// Distance from the projected input to `point` in meters.
    pub distance: f64,
    /// Index of the segment (`line[i]` → `line[i + 1]`) holding `point`.
    pub segment_index: usize,
    /// Distance along the line from its first point to `point` in meters.
    pub distance_along: f64,
}

/// Project `point` onto `line`.
///
/// Returns `None` for an empty line. A single-point line projects onto that
/// point. Ties between segments resolve to the earliest segment.
pub fn project_onto_line(point: GeoPoint, line: &[GeoPoint]) -> Option<LineProjection> {
    let first = *line.first()?;
    if line.len() == 1 {
        return Some(LineProjection {
            point: first,
            distance: distance(point, first),
            segment_index: 0,
            distance_along: 0.0,
        });
    }

    let target = point.to_point();
    let mut best: Option<(usize, GeoPoint, f64)> = None;

    for (index, segment) in line.windows(2).enumerate() {
        let candidate = closest_on_segment(segment[0], segment[1], target);
        let d = distance(point, candidate);
        match best {
            Some((_, _, best_distance)) if d >= best_distance => {}
            _ => best = Some((index, candidate, d)),
        }
    }

    let (segment_index, projected, d) = best?;
    let distance_along = line_length(&line[..=segment_index]) + distance(line[segment_index], projected);

    Some(LineProjection {
        point: projected,
        distance: d,
        segment_index,
        distance_along,
    })
}

fn closest_on_segment(start: GeoPoint, end: GeoPoint, target: Point<f64>) -> GeoPoint {
    if start == end {
        return start;
    }
    match Line::new(start.to_point(), end.to_point()).closest_point(&target) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p.into(),
        Closest::Indeterminate => start,
    }
}

/// Distance in meters from a projection to the end of the line it was made on.
pub fn remaining_along_line(line: &[GeoPoint], projection: &LineProjection) -> f64 {
    let next = projection.segment_index + 1;
    if next >= line.len() {
        return 0.0;
    }
    distance(projection.point, line[next]) + line_length(&line[next..])
}

/// The point `distance_m` meters along `line` from its first point.
///
/// Interpolation within a segment is linear in longitude/latitude, so the
/// returned point lies exactly on the segment used by [`project_onto_line`].
/// Distances past the end clamp to the last point.
pub fn point_along_line(line: &[GeoPoint], distance_m: f64) -> Option<GeoPoint> {
    let first = *line.first()?;
    if distance_m <= 0.0 {
        return Some(first);
    }

    let mut travelled = 0.0;
    for segment in line.windows(2) {
        let length = distance(segment[0], segment[1]);
        if length > 0.0 && travelled + length >= distance_m {
            let fraction = (distance_m - travelled) / length;
            return Some(GeoPoint::new(
                segment[0].latitude + (segment[1].latitude - segment[0].latitude) * fraction,
                segment[0].longitude + (segment[1].longitude - segment[0].longitude) * fraction,
            ));
        }
        travelled += length;
    }

    line.last().copied()
}

/// Bearing of segment `segment_index` of `line`, if it exists and has length.
pub fn segment_bearing(line: &[GeoPoint], segment_index: usize) -> Option<f64> {
    let start = *line.get(segment_index)?;
    let end = *line.get(segment_index + 1)?;
    if start == end {
        return None;
    }
    Some(bearing(start, end))
}

/// Whether a line has at least two distinct points (a usable segment).
pub fn has_extent(line: &[GeoPoint]) -> bool {
    match line.first() {
        Some(first) => line.iter().any(|p| p != first),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn east_line() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(38.9, -77.05),
            GeoPoint::new(38.9, -77.045),
            GeoPoint::new(38.9, -77.04),
        ]
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let d = distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 200.0, "got {}", d);
    }

    #[test]
    fn test_distance_same_point_is_zero() {
        let p = GeoPoint::new(53.5, 10.0);
        assert!(distance(p, p).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = GeoPoint::new(0.0, 0.0);
        assert!(bearing(origin, GeoPoint::new(1.0, 0.0)).abs() < 0.1);
        assert!((bearing(origin, GeoPoint::new(0.0, 1.0)) - 90.0).abs() < 0.1);
        assert!((bearing(origin, GeoPoint::new(-1.0, 0.0)) - 180.0).abs() < 0.1);
        assert!((bearing(origin, GeoPoint::new(0.0, -1.0)) - 270.0).abs() < 0.1);
    }

    #[test]
    fn test_bearing_difference_wraps() {
        assert!((bearing_difference(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((bearing_difference(10.0, 350.0) - 20.0).abs() < 1e-9);
        assert!((bearing_difference(90.0, 270.0) - 180.0).abs() < 1e-9);
        assert!(bearing_difference(45.0, 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_destination_travels_requested_distance() {
        let origin = GeoPoint::new(38.9, -77.04);
        let target = destination(origin, 90.0, 100.0);
        assert!((distance(origin, target) - 100.0).abs() < 0.5);
        assert!(target.longitude > origin.longitude);
    }

    #[test]
    fn test_line_length_sums_segments() {
        let line = east_line();
        let total = line_length(&line);
        let parts = distance(line[0], line[1]) + distance(line[1], line[2]);
        assert!((total - parts).abs() < 1e-6);
        assert!(total > 800.0 && total < 900.0, "got {}", total);
    }

    #[test]
    fn test_project_point_north_of_line() {
        let line = east_line();
        let point = destination(GeoPoint::new(38.9, -77.042), 0.0, 30.0);
        let projection = project_onto_line(point, &line).unwrap();

        assert_eq!(projection.segment_index, 1);
        assert!((projection.distance - 30.0).abs() < 1.0, "got {}", projection.distance);
        assert!((projection.point.latitude - 38.9).abs() < 1e-4);
    }

    #[test]
    fn test_project_beyond_end_clamps_to_last_point() {
        let line = east_line();
        let point = GeoPoint::new(38.9, -77.03);
        let projection = project_onto_line(point, &line).unwrap();

        assert_eq!(projection.point, line[2]);
        assert!(remaining_along_line(&line, &projection) < 1e-6);
    }

    #[test]
    fn test_project_empty_line() {
        assert!(project_onto_line(GeoPoint::new(0.0, 0.0), &[]).is_none());
    }

    #[test]
    fn test_project_single_point_line() {
        let only = GeoPoint::new(38.9, -77.04);
        let projection = project_onto_line(GeoPoint::new(38.9, -77.041), &[only]).unwrap();
        assert_eq!(projection.point, only);
        assert_eq!(projection.segment_index, 0);
        assert!(remaining_along_line(&[only], &projection).abs() < 1e-9);
    }

    #[test]
    fn test_remaining_plus_along_equals_length() {
        let line = east_line();
        let point = GeoPoint::new(38.9001, -77.047);
        let projection = project_onto_line(point, &line).unwrap();
        let total = projection.distance_along + remaining_along_line(&line, &projection);
        assert!((total - line_length(&line)).abs() < 0.01);
    }

    #[test]
    fn test_point_along_line_halfway() {
        let line = east_line();
        let half = line_length(&line) / 2.0;
        let point = point_along_line(&line, half).unwrap();
        assert!((point.longitude - -77.045).abs() < 1e-4);
    }

    #[test]
    fn test_point_along_line_clamps() {
        let line = east_line();
        assert_eq!(point_along_line(&line, -5.0), Some(line[0]));
        assert_eq!(point_along_line(&line, 1e9), Some(line[2]));
        assert_eq!(point_along_line(&[], 10.0), None);
    }

    #[test]
    fn test_segment_bearing() {
        let line = east_line();
        assert!((segment_bearing(&line, 0).unwrap() - 90.0).abs() < 0.1);
        assert!(segment_bearing(&line, 2).is_none());
        let degenerate = vec![line[0], line[0]];
        assert!(segment_bearing(&degenerate, 0).is_none());
    }

    #[test]
    fn test_has_extent() {
        let p = GeoPoint::new(1.0, 1.0);
        assert!(!has_extent(&[]));
        assert!(!has_extent(&[p]));
        assert!(!has_extent(&[p, p]));
        assert!(has_extent(&east_line()));
    }

    #[test]
    fn test_geo_point_validity() {
        assert!(GeoPoint::new(45.0, 120.0).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    proptest! {
        #[test]
        fn prop_points_along_line_project_onto_it(fraction in 0.0f64..1.0) {
            let line = east_line();
            let target = line_length(&line) * fraction;
            let point = point_along_line(&line, target).unwrap();
            let projection = project_onto_line(point, &line).unwrap();

            prop_assert!(projection.distance < 0.01);
            prop_assert!((projection.distance_along - target).abs() < 0.5);
        }

        #[test]
        fn prop_projection_distance_non_negative(
            lat in 38.85f64..38.95,
            lon in -77.10f64..-77.00,
        ) {
            let projection = project_onto_line(GeoPoint::new(lat, lon), &east_line()).unwrap();
            prop_assert!(projection.distance >= 0.0);
            prop_assert!(projection.distance_along >= 0.0);
        }
    }
}
