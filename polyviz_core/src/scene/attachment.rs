use super::{NodeId, PrimitiveBatch, SharedScene};
use crate::error::VizResult;
use nalgebra::{UnitQuaternion, Vector3};
use tracing::trace;

/// A display's node in the host scene graph
///
/// Created with the display and destroyed with it. Every commit replaces
/// the node's primitives in full.
pub struct SceneAttachment {
    scene: SharedScene,
    node: NodeId,
}

impl SceneAttachment {
    /// Create the backing node; failure here is fatal to the display
    pub fn new(scene: SharedScene) -> VizResult<Self> {
        let node = scene.lock().create_node()?;
        trace!(%node, "scene attachment created");
        Ok(Self { scene, node })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Drop all committed primitives
    pub fn clear(&self) {
        self.scene.lock().clear_node(self.node);
    }

    pub fn set_visible(&self, visible: bool) {
        self.scene.lock().set_node_visible(self.node, visible);
    }

    pub fn set_pose(&self, position: Vector3<f32>, orientation: UnitQuaternion<f32>) {
        self.scene
            .lock()
            .set_node_pose(self.node, position, orientation);
    }

    /// Replace the node's primitives with `batch` and move it to the given pose
    pub fn commit(
        &self,
        batch: &PrimitiveBatch,
        position: Vector3<f32>,
        orientation: UnitQuaternion<f32>,
    ) {
        let mut scene = self.scene.lock();
        scene.clear_node(self.node);

        match batch {
            PrimitiveBatch::LineStrips(strips) => {
                for strip in strips.iter().filter(|s| !s.vertices.is_empty()) {
                    scene.estimate_vertex_count(self.node, strip.vertices.len());
                    scene.begin_line_strip(self.node);
                    for vertex in &strip.vertices {
                        scene.append_vertex(self.node, *vertex);
                    }
                    scene.end_line_strip(self.node);
                }
            }
            PrimitiveBatch::Points { points, point_size } => {
                if !points.is_empty() {
                    scene.submit_points(self.node, points, *point_size);
                }
            }
            PrimitiveBatch::Axes { length, radius } => {
                scene.submit_axes(self.node, *length, *radius);
            }
        }

        scene.set_node_pose(self.node, position, orientation);
    }
}

impl Drop for SceneAttachment {
    fn drop(&mut self) {
        let mut scene = self.scene.lock();
        scene.clear_node(self.node);
        scene.destroy_node(self.node);
        trace!(node = %self.node, "scene attachment released");
    }
}
