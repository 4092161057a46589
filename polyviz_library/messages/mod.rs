//! Message types consumed by polyviz displays
//!
//! - Geometry: point primitives (Point3, Point2)
//! - Polygon: polygonal maps and planar polylines
//!
//! All message types are re-exported at the crate root for convenience.

pub mod geometry;
pub mod polygon;

pub use geometry::{Point2, Point3};
pub use polygon::{Polygon, PolygonalMap, Polyline};
