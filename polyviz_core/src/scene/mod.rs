//! Scene graph host contract
//!
//! Displays never talk to a renderer directly. They own a
//! [`SceneAttachment`] (one node in the host's scene graph) and commit whole
//! [`PrimitiveBatch`]es through the [`SceneHost`] trait.

pub mod attachment;
pub mod recording;

pub use attachment::SceneAttachment;
pub use recording::{RecordedNode, RecordingScene};

use crate::error::VizResult;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// RGB color, components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const RED: Color = Color::new(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::new(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::new(0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn with_alpha(self, a: f32) -> ColorRgba {
        ColorRgba {
            r: self.r,
            g: self.g,
            b: self.b,
            a,
        }
    }
}

/// RGBA color as committed to the scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    pub fn rgb(&self) -> Color {
        Color::new(self.r, self.g, self.b)
    }
}

/// One vertex of a primitive, in the attachment node's local frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredVertex {
    pub position: Point3<f32>,
    pub color: ColorRgba,
}

impl ColoredVertex {
    pub fn new(position: Point3<f32>, color: ColorRgba) -> Self {
        Self { position, color }
    }
}

/// Connected sequence of vertices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineStrip {
    pub vertices: Vec<ColoredVertex>,
}

/// Everything one synchronization pass commits to an attachment
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveBatch {
    /// One strip per source polygon, in message order
    LineStrips(Vec<LineStrip>),
    /// Flat point cloud with per-point color
    Points {
        points: Vec<ColoredVertex>,
        point_size: f32,
    },
    /// RGB coordinate axes at the node origin
    Axes { length: f32, radius: f32 },
}

impl PrimitiveBatch {
    /// Total vertices across all primitives (axes count as none)
    pub fn vertex_count(&self) -> usize {
        match self {
            PrimitiveBatch::LineStrips(strips) => strips.iter().map(|s| s.vertices.len()).sum(),
            PrimitiveBatch::Points { points, .. } => points.len(),
            PrimitiveBatch::Axes { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PrimitiveBatch::Axes { .. } => false,
            _ => self.vertex_count() == 0,
        }
    }
}

/// Handle to a node owned by a [`SceneHost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Operations a display needs from the scene graph and primitive renderer
///
/// Line strips are emitted with `begin_line_strip` / `append_vertex` /
/// `end_line_strip`; `estimate_vertex_count` is a sizing hint given before
/// each strip is begun.
pub trait SceneHost: Send {
    /// Create a new child node of the scene root
    fn create_node(&mut self) -> VizResult<NodeId>;

    fn destroy_node(&mut self, node: NodeId);

    fn set_node_pose(
        &mut self,
        node: NodeId,
        position: Vector3<f32>,
        orientation: UnitQuaternion<f32>,
    );

    fn set_node_visible(&mut self, node: NodeId, visible: bool);

    /// Remove every primitive attached to `node`
    fn clear_node(&mut self, node: NodeId);

    fn estimate_vertex_count(&mut self, node: NodeId, count: usize);

    fn begin_line_strip(&mut self, node: NodeId);

    fn append_vertex(&mut self, node: NodeId, vertex: ColoredVertex);

    fn end_line_strip(&mut self, node: NodeId);

    fn submit_points(&mut self, node: NodeId, points: &[ColoredVertex], point_size: f32);

    fn submit_axes(&mut self, node: NodeId, length: f32, radius: f32);
}

/// Scene host shared between displays and the render loop
pub type SharedScene = Arc<Mutex<dyn SceneHost>>;
