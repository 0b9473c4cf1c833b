//! Paths and segments
//!
//! A path is an ordered list of straight segments plus the full polyline used
//! for drawing. Vehicles traverse the segments one at a time.

use serde::{Deserialize, Serialize};

use super::types::{GeoPoint, NodeId, PathId};

/// Convert km/h to m/s
pub fn kmh_to_ms(speed_kmh: f64) -> f64 {
    speed_kmh * 1000.0 / 3600.0
}

/// A straight sub-leg of a path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub distance_m: f64,
}

impl Segment {
    pub fn new(start: GeoPoint, end: GeoPoint, distance_m: f64) -> Self {
        Self {
            start,
            end,
            distance_m,
        }
    }

    /// Segment with its distance measured from the endpoints
    pub fn between(start: GeoPoint, end: GeoPoint) -> Self {
        Self::new(start, end, start.distance_m(&end))
    }

    /// Time to traverse this segment in milliseconds
    pub fn travel_time_ms(&self, speed_kmh: f64) -> f64 {
        if speed_kmh <= 0.0 {
            return f64::INFINITY;
        }
        self.distance_m / kmh_to_ms(speed_kmh) * 1000.0
    }

    /// Position after covering `fraction` (0..=1) of the segment
    pub fn point_at(&self, fraction: f64) -> GeoPoint {
        self.start.lerp(&self.end, fraction.clamp(0.0, 1.0))
    }
}

/// One end of a path: a node, or a free point for ad-hoc journeys
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathEnd {
    Node(NodeId),
    Point(GeoPoint),
}

impl PathEnd {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            PathEnd::Node(id) => Some(*id),
            PathEnd::Point(_) => None,
        }
    }
}

/// Segments and polyline returned by a router
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteData {
    pub segments: Vec<Segment>,
    pub geometry: Vec<GeoPoint>,
}

impl RouteData {
    /// Single-segment route, used whenever real routing is unavailable
    pub fn straight_line(from: GeoPoint, to: GeoPoint) -> Self {
        Self {
            segments: vec![Segment::between(from, to)],
            geometry: vec![from, to],
        }
    }

    /// Build contiguous segments from a polyline.
    /// Consecutive duplicate points are collapsed.
    pub fn from_geometry(points: Vec<GeoPoint>) -> Self {
        let mut geometry: Vec<GeoPoint> = Vec::with_capacity(points.len());
        for point in points {
            if geometry.last() != Some(&point) {
                geometry.push(point);
            }
        }

        let segments = geometry
            .windows(2)
            .map(|pair| Segment::between(pair[0], pair[1]))
            .collect();

        Self { segments, geometry }
    }

    pub fn total_distance_m(&self) -> f64 {
        self.segments.iter().map(|s| s.distance_m).sum()
    }
}

/// A routed corridor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub id: PathId,
    pub start: PathEnd,
    pub end: PathEnd,
    pub segments: Vec<Segment>,
    /// Full polyline for rendering
    pub geometry: Vec<GeoPoint>,
    pub active: bool,
    /// Mission paths are deleted once their vehicle is done with them
    pub temporary: bool,
}

impl Path {
    pub fn new(id: PathId, start: PathEnd, end: PathEnd, route: RouteData, temporary: bool) -> Self {
        Self {
            id,
            start,
            end,
            segments: route.segments,
            geometry: route.geometry,
            active: true,
            temporary,
        }
    }

    pub fn total_distance_m(&self) -> f64 {
        self.segments.iter().map(|s| s.distance_m).sum()
    }

    pub fn total_travel_time_ms(&self, speed_kmh: f64) -> f64 {
        self.segments
            .iter()
            .map(|s| s.travel_time_ms(speed_kmh))
            .sum()
    }

    /// Whether this path joins the two nodes, in either direction
    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        let ends = (self.start.node(), self.end.node());
        ends == (Some(a), Some(b)) || ends == (Some(b), Some(a))
    }

    pub fn first_point(&self) -> Option<GeoPoint> {
        self.segments.first().map(|s| s.start)
    }

    pub fn last_point(&self) -> Option<GeoPoint> {
        self.segments.last().map(|s| s.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn travel_time_uses_meters_per_second() {
        let segment = Segment::new(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.0), 100.0);
        // 36 km/h = 10 m/s
        assert!((segment.travel_time_ms(36.0) - 10_000.0).abs() < 1e-9);
        assert!(segment.travel_time_ms(0.0).is_infinite());
    }

    #[test]
    fn geometry_segments_are_contiguous() {
        let route = RouteData::from_geometry(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.001, 0.0),
            GeoPoint::new(0.001, 0.001),
        ]);
        assert_eq!(route.segments.len(), 2);
        assert_eq!(route.segments[0].end, route.segments[1].start);
    }
}
