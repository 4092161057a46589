//! In-memory scene host
//!
//! Keeps the last committed state of every node so headless runs and tests
//! can inspect exactly what a display rendered.

use super::{ColoredVertex, NodeId, SceneHost};
use crate::error::{VizError, VizResult};
use nalgebra::{UnitQuaternion, Vector3};
use std::collections::BTreeMap;
use tracing::warn;

/// Recorded state of one scene node
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedNode {
    pub position: Vector3<f32>,
    pub orientation: UnitQuaternion<f32>,
    pub visible: bool,
    pub line_strips: Vec<Vec<ColoredVertex>>,
    pub points: Vec<ColoredVertex>,
    pub point_size: f32,
    pub axes: Option<(f32, f32)>,
    /// Every sizing hint received, in order
    pub vertex_estimates: Vec<usize>,
    pub clear_count: u64,
    open_strip: Option<Vec<ColoredVertex>>,
}

impl Default for RecordedNode {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            visible: true,
            line_strips: Vec::new(),
            points: Vec::new(),
            point_size: 0.0,
            axes: None,
            vertex_estimates: Vec::new(),
            clear_count: 0,
            open_strip: None,
        }
    }
}

impl RecordedNode {
    /// Number of primitives currently attached (each strip, the point set, the axes)
    pub fn primitive_count(&self) -> usize {
        self.line_strips.len() + usize::from(!self.points.is_empty()) + usize::from(self.axes.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.primitive_count() == 0
    }

    /// Every vertex of every line strip, in emission order
    pub fn strip_vertices(&self) -> impl Iterator<Item = &ColoredVertex> {
        self.line_strips.iter().flatten()
    }
}

/// [`SceneHost`] that records instead of rendering
#[derive(Debug, Default)]
pub struct RecordingScene {
    nodes: BTreeMap<NodeId, RecordedNode>,
    destroyed: Vec<NodeId>,
    next_id: u64,
    fail_node_creation: bool,
}

impl RecordingScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create_node` calls fail, like an exhausted renderer
    pub fn set_fail_node_creation(&mut self, fail: bool) {
        self.fail_node_creation = fail;
    }

    pub fn node(&self, id: NodeId) -> Option<&RecordedNode> {
        self.nodes.get(&id)
    }

    /// Live nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &RecordedNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes destroyed so far, in destruction order
    pub fn destroyed(&self) -> &[NodeId] {
        &self.destroyed
    }

    /// Primitives across all live nodes
    pub fn primitive_count(&self) -> usize {
        self.nodes.values().map(RecordedNode::primitive_count).sum()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut RecordedNode> {
        let node = self.nodes.get_mut(&id);
        if node.is_none() {
            warn!(node = %id, "scene operation on unknown node");
        }
        node
    }
}

impl SceneHost for RecordingScene {
    fn create_node(&mut self) -> VizResult<NodeId> {
        if self.fail_node_creation {
            return Err(VizError::Scene("unable to allocate scene node".to_string()));
        }
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, RecordedNode::default());
        Ok(id)
    }

    fn destroy_node(&mut self, node: NodeId) {
        if self.nodes.remove(&node).is_some() {
            self.destroyed.push(node);
        }
    }

    fn set_node_pose(
        &mut self,
        node: NodeId,
        position: Vector3<f32>,
        orientation: UnitQuaternion<f32>,
    ) {
        if let Some(node) = self.node_mut(node) {
            node.position = position;
            node.orientation = orientation;
        }
    }

    fn set_node_visible(&mut self, node: NodeId, visible: bool) {
        if let Some(node) = self.node_mut(node) {
            node.visible = visible;
        }
    }

    fn clear_node(&mut self, node: NodeId) {
        if let Some(node) = self.node_mut(node) {
            node.line_strips.clear();
            node.points.clear();
            node.axes = None;
            node.open_strip = None;
            node.clear_count += 1;
        }
    }

    fn estimate_vertex_count(&mut self, node: NodeId, count: usize) {
        if let Some(node) = self.node_mut(node) {
            node.vertex_estimates.push(count);
        }
    }

    fn begin_line_strip(&mut self, node: NodeId) {
        if let Some(node) = self.node_mut(node) {
            node.open_strip = Some(Vec::new());
        }
    }

    fn append_vertex(&mut self, id: NodeId, vertex: ColoredVertex) {
        if let Some(node) = self.node_mut(id) {
            match node.open_strip.as_mut() {
                Some(strip) => strip.push(vertex),
                None => warn!(node = %id, "vertex appended outside a line strip"),
            }
        }
    }

    fn end_line_strip(&mut self, node: NodeId) {
        if let Some(node) = self.node_mut(node) {
            if let Some(strip) = node.open_strip.take() {
                node.line_strips.push(strip);
            }
        }
    }

    fn submit_points(&mut self, node: NodeId, points: &[ColoredVertex], point_size: f32) {
        if let Some(node) = self.node_mut(node) {
            node.points = points.to_vec();
            node.point_size = point_size;
        }
    }

    fn submit_axes(&mut self, node: NodeId, length: f32, radius: f32) {
        if let Some(node) = self.node_mut(node) {
            node.axes = Some((length, radius));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Color;
    use nalgebra::Point3;

    #[test]
    fn test_line_strip_recording() {
        let mut scene = RecordingScene::new();
        let id = scene.create_node().unwrap();
        let color = Color::BLUE.with_alpha(0.5);

        scene.begin_line_strip(id);
        scene.append_vertex(id, ColoredVertex::new(Point3::origin(), color));
        scene.append_vertex(id, ColoredVertex::new(Point3::new(1.0, 0.0, 0.0), color));
        scene.end_line_strip(id);

        let node = scene.node(id).unwrap();
        assert_eq!(node.line_strips.len(), 1);
        assert_eq!(node.primitive_count(), 1);
        assert_eq!(scene.primitive_count(), 1);
    }

    #[test]
    fn test_vertex_outside_strip_is_ignored() {
        let mut scene = RecordingScene::new();
        let id = scene.create_node().unwrap();
        scene.append_vertex(id, ColoredVertex::new(Point3::origin(), Color::RED.with_alpha(1.0)));
        assert!(scene.node(id).unwrap().is_empty());
    }

    #[test]
    fn test_clear_and_destroy() {
        let mut scene = RecordingScene::new();
        let id = scene.create_node().unwrap();
        scene.submit_axes(id, 1.0, 0.1);
        scene.clear_node(id);
        assert!(scene.node(id).unwrap().is_empty());
        assert_eq!(scene.node(id).unwrap().clear_count, 1);

        scene.destroy_node(id);
        scene.destroy_node(id);
        assert_eq!(scene.node_count(), 0);
        assert_eq!(scene.destroyed(), &[id]);
    }

    #[test]
    fn test_fail_node_creation() {
        let mut scene = RecordingScene::new();
        scene.set_fail_node_creation(true);
        assert!(matches!(scene.create_node(), Err(VizError::Scene(_))));
    }
}
