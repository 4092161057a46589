use polyviz_core::LogSummary;
use serde::{Deserialize, Serialize};

/// 3D point in a message's coordinate frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f32; 3]> for Point3 {
    fn from(p: [f32; 3]) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

impl From<Point3> for nalgebra::Point3<f32> {
    fn from(p: Point3) -> Self {
        nalgebra::Point3::new(p.x, p.y, p.z)
    }
}

impl LogSummary for Point3 {
    fn log_summary(&self) -> String {
        format!("({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Planar point; lifted to z = 0
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Point2> for Point3 {
    fn from(p: Point2) -> Self {
        Point3::new(p.x, p.y, 0.0)
    }
}
