use super::geometry::{Point2, Point3};
use polyviz_core::{Color, LogSummary};
use serde::{Deserialize, Serialize};

/// Ordered ring of points with an optional color
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point3>,
    #[serde(default)]
    pub color: Option<Color>,
}

impl Polygon {
    pub fn new(points: Vec<Point3>) -> Self {
        Self {
            points,
            color: None,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// Collection of polygons, rendered as one strip or point run per polygon
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolygonalMap {
    pub stamp_nanos: u64,
    pub polygons: Vec<Polygon>,
}

impl PolygonalMap {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self {
            stamp_nanos: crate::tf::timestamp_now(),
            polygons,
        }
    }

    pub fn point_count(&self) -> usize {
        self.polygons.iter().map(|p| p.points.len()).sum()
    }
}

impl LogSummary for PolygonalMap {
    fn log_summary(&self) -> String {
        format!(
            "PolygonalMap(polygons: {}, points: {})",
            self.polygons.len(),
            self.point_count()
        )
    }
}

/// Planar polyline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline {
    pub stamp_nanos: u64,
    pub points: Vec<Point2>,
    #[serde(default)]
    pub color: Option<Color>,
}

impl Polyline {
    pub fn new(points: Vec<Point2>) -> Self {
        Self {
            stamp_nanos: crate::tf::timestamp_now(),
            points,
            color: None,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// The polyline as a single z = 0 polygon, optionally closed back to its first point
    pub fn to_polygon(&self, close_loop: bool) -> Polygon {
        let mut points: Vec<Point3> = self.points.iter().map(|&p| p.into()).collect();
        if close_loop && points.len() > 1 {
            points.push(points[0]);
        }
        Polygon {
            points,
            color: self.color,
        }
    }
}

impl LogSummary for Polyline {
    fn log_summary(&self) -> String {
        format!("Polyline(points: {})", self.points.len())
    }
}
