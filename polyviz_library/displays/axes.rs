//! Coordinate axes display
//!
//! Draws a red/green/blue triad at the origin of a reference frame,
//! re-resolved into the fixed frame on every tick.

use crate::tf::{FrameResolver, TransformResult};
use nalgebra::{UnitQuaternion, Vector3};
use polyviz_core::{
    Display, DisplayContext, DisplayStatus, PrimitiveBatch, PropertyDescriptor, PropertyObserver,
    PropertyTable, PropertyValue, SceneAttachment, TimeQuery, VizResult,
};
use std::sync::Arc;
use tracing::{info, warn};

pub const AXES_TYPE_NAME: &str = "Axes";
pub const AXES_DESCRIPTION: &str = "Displays an axis at the origin of a reference frame.";

const MIN_EXTENT: f32 = 0.0001;

pub struct AxesDisplay {
    name: String,
    context: DisplayContext,
    resolver: FrameResolver,
    attachment: SceneAttachment,
    length: f32,
    radius: f32,
    /// Empty means the fixed frame itself
    reference_frame: String,
    enabled: bool,
    status: DisplayStatus,
    properties: Arc<PropertyTable<Self>>,
    observer: Option<PropertyObserver>,
}

impl AxesDisplay {
    pub fn new(name: &str, context: &DisplayContext) -> VizResult<Self> {
        let attachment = SceneAttachment::new(context.scene.clone())?;
        attachment.set_visible(false);

        let display = Self {
            name: name.to_string(),
            resolver: FrameResolver::new(Arc::clone(&context.frames)),
            context: context.clone(),
            attachment,
            length: 1.0,
            radius: 0.1,
            reference_frame: String::new(),
            enabled: false,
            status: DisplayStatus::ok(),
            properties: Arc::new(Self::property_table()),
            observer: None,
        };
        display.rebuild();
        Ok(display)
    }

    pub fn create(name: &str, context: &DisplayContext) -> VizResult<Box<dyn Display>> {
        Ok(Box::new(Self::new(name, context)?))
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn reference_frame(&self) -> &str {
        &self.reference_frame
    }

    pub fn set_length(&mut self, length: f32) {
        self.length = length;
        self.refresh();
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
        self.refresh();
    }

    pub fn set_reference_frame(&mut self, frame: &str) {
        self.reference_frame = frame.to_string();
        if self.enabled {
            self.update_pose();
        }
    }

    fn batch(&self) -> PrimitiveBatch {
        PrimitiveBatch::Axes {
            length: self.length,
            radius: self.radius,
        }
    }

    fn rebuild(&self) {
        self.attachment
            .commit(&self.batch(), Vector3::zeros(), UnitQuaternion::identity());
        self.context.request_render();
    }

    fn refresh(&mut self) {
        self.rebuild();
        if self.enabled {
            self.update_pose();
        }
    }

    /// Move the axes to the reference frame origin, identity when unavailable
    fn update_pose(&mut self) {
        if self.reference_frame.is_empty() {
            self.attachment
                .set_pose(Vector3::zeros(), UnitQuaternion::identity());
            self.status = DisplayStatus::ok();
            return;
        }

        let fixed_frame = self.context.fixed_frame();
        let result = self
            .resolver
            .resolve(&self.reference_frame, &fixed_frame, TimeQuery::Latest);
        let (position, orientation) = result.or_identity(Vector3::zeros());
        match &result {
            TransformResult::Resolved { .. } => self.status = DisplayStatus::ok(),
            TransformResult::Unavailable { reason } => {
                if self.status.message != *reason {
                    warn!(
                        display = %self.name,
                        fixed_frame = %fixed_frame,
                        reason = %reason,
                        "axes frame unavailable"
                    );
                }
                self.status = DisplayStatus::warn(reason.clone());
            }
        }
        self.attachment.set_pose(position, orientation);
        self.context.request_render();
    }

    fn property_table() -> PropertyTable<Self> {
        PropertyTable::<Self>::new()
            .float(
                "Length",
                "Length of each axis.",
                (MIN_EXTENT, f32::MAX),
                |d| d.length,
                |d, v| d.set_length(v),
            )
            .float(
                "Radius",
                "Radius of each axis.",
                (MIN_EXTENT, f32::MAX),
                |d| d.radius,
                |d, v| d.set_radius(v),
            )
            .string(
                "Reference Frame",
                "Frame whose origin the axes mark; empty for the fixed frame.",
                |d| d.reference_frame.clone(),
                |d, v| d.set_reference_frame(v),
            )
    }
}

impl Display for AxesDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        AXES_TYPE_NAME
    }

    fn description(&self) -> &'static str {
        AXES_DESCRIPTION
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn on_enable(&mut self) -> VizResult<()> {
        self.enabled = true;
        self.attachment.set_visible(true);
        self.update_pose();
        info!(display = %self.name, "display enabled");
        Ok(())
    }

    fn on_disable(&mut self) {
        self.enabled = false;
        self.attachment.set_visible(false);
        self.context.request_render();
        info!(display = %self.name, "display disabled");
    }

    fn fixed_frame_changed(&mut self) {
        if self.enabled {
            self.update_pose();
        }
    }

    fn update(&mut self, _dt: f64) {
        if self.enabled {
            self.update_pose();
        }
    }

    fn reset(&mut self) {
        self.status = DisplayStatus::ok();
        self.refresh();
    }

    fn status(&self) -> DisplayStatus {
        self.status.clone()
    }

    fn property_descriptors(&self) -> Vec<PropertyDescriptor> {
        self.properties.descriptors()
    }

    fn get_property(&self, name: &str) -> VizResult<PropertyValue> {
        self.properties.get(self, name)
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> VizResult<()> {
        let table = Arc::clone(&self.properties);
        let applied = table.set(self, name, value)?;
        if let Some(observer) = &self.observer {
            observer(name, &applied);
        }
        Ok(())
    }

    fn set_property_observer(&mut self, observer: Option<PropertyObserver>) {
        self.observer = observer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tf::SharedTfTree;
    use approx::assert_relative_eq;
    use nalgebra::Isometry3;
    use parking_lot::Mutex;
    use polyviz_core::{RecordingScene, SharedScene, TopicBus};

    fn setup() -> (Arc<Mutex<RecordingScene>>, SharedTfTree, DisplayContext) {
        let recording = Arc::new(Mutex::new(RecordingScene::new()));
        let scene: SharedScene = recording.clone();
        let tf = SharedTfTree::new("map");
        let ctx = DisplayContext::new(scene, Arc::new(tf.clone()), Arc::new(TopicBus::new()), "map");
        (recording, tf, ctx)
    }

    #[test]
    fn test_hidden_until_enabled() {
        let (recording, _tf, ctx) = setup();
        let mut axes = AxesDisplay::new("axes", &ctx).unwrap();
        let node = recording.lock().node(axes.attachment.node()).cloned().unwrap();
        assert!(!node.visible);
        assert_eq!(node.axes, Some((1.0, 0.1)));

        axes.on_enable().unwrap();
        assert!(recording.lock().node(axes.attachment.node()).unwrap().visible);
        axes.on_disable();
        assert!(!recording.lock().node(axes.attachment.node()).unwrap().visible);
    }

    #[test]
    fn test_length_is_clamped() {
        let (recording, _tf, ctx) = setup();
        let mut axes = AxesDisplay::new("axes", &ctx).unwrap();
        axes.set_property("Length", PropertyValue::Float(-3.0)).unwrap();
        assert_eq!(axes.length(), MIN_EXTENT);
        let node = axes.attachment.node();
        assert_eq!(recording.lock().node(node).unwrap().axes, Some((MIN_EXTENT, 0.1)));
    }

    #[test]
    fn test_follows_reference_frame() {
        let (recording, tf, ctx) = setup();
        let mut axes = AxesDisplay::new("axes", &ctx).unwrap();
        axes.set_property("Reference Frame", PropertyValue::String("base".to_string()))
            .unwrap();
        axes.on_enable().unwrap();
        assert_eq!(axes.status().level, polyviz_core::StatusLevel::Warn);

        tf.add_static_transform("map", "base", Isometry3::translation(2.0, 0.0, 0.0))
            .unwrap();
        axes.update(0.1);
        assert!(axes.status().is_ok());
        let position = recording.lock().node(axes.attachment.node()).unwrap().position;
        assert_relative_eq!(position, Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-6);
    }
}
