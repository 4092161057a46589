//! Message-driven polygon displays
//!
//! [`MessageDisplay`] binds a [`SyncController`] to the property table and
//! the [`Display`] lifecycle. The message type and display metadata come
//! from a [`MessageKind`], so the polygonal map and polyline displays share
//! one implementation.

use super::config::{RenderConfig, RenderMode};
use super::geometry::PolygonSource;
use super::sync::SyncController;
use crate::messages::{PolygonalMap, Polyline};
use polyviz_core::{
    Display, DisplayContext, DisplayStatus, PropertyDescriptor, PropertyObserver, PropertyTable,
    PropertyValue, VizResult,
};
use std::marker::PhantomData;
use std::sync::Arc;

/// Static description of one message-driven display kind
pub trait MessageKind: Send + 'static {
    type Message: PolygonSource + Clone + Send + Sync + 'static;

    const TYPE_NAME: &'static str;
    const DESCRIPTION: &'static str;
    /// Whether the display offers the "Loop" property
    const HAS_LOOP: bool;
}

#[derive(Debug)]
pub struct PolygonalMapKind;

impl MessageKind for PolygonalMapKind {
    type Message = PolygonalMap;

    const TYPE_NAME: &'static str = "PolygonalMap";
    const DESCRIPTION: &'static str =
        "Displays data from a polygonal map message as either points or lines.";
    const HAS_LOOP: bool = false;
}

#[derive(Debug)]
pub struct PolylineKind;

impl MessageKind for PolylineKind {
    type Message = Polyline;

    const TYPE_NAME: &'static str = "Polyline";
    const DESCRIPTION: &'static str =
        "Displays data from a polyline message as either points or lines.";
    const HAS_LOOP: bool = true;
}

pub type PolygonalMapDisplay = MessageDisplay<PolygonalMapKind>;
pub type PolylineDisplay = MessageDisplay<PolylineKind>;

pub struct MessageDisplay<K: MessageKind> {
    sync: SyncController<K::Message>,
    properties: Arc<PropertyTable<Self>>,
    observer: Option<PropertyObserver>,
    _kind: PhantomData<K>,
}

impl<K: MessageKind> MessageDisplay<K> {
    pub fn new(name: &str, context: &DisplayContext) -> VizResult<Self> {
        Self::with_config(name, context, RenderConfig::default())
    }

    /// Create the display with an initial configuration; the topic is
    /// only subscribed once the display is enabled
    pub fn with_config(name: &str, context: &DisplayContext, config: RenderConfig) -> VizResult<Self> {
        Ok(Self {
            sync: SyncController::new(name, context.clone(), config)?,
            properties: Arc::new(Self::property_table()),
            observer: None,
            _kind: PhantomData,
        })
    }

    /// Factory suitable for [`polyviz_core::DisplayRegistry::register`]
    pub fn create(name: &str, context: &DisplayContext) -> VizResult<Box<dyn Display>> {
        Ok(Box::new(Self::new(name, context)?))
    }

    pub fn controller(&self) -> &SyncController<K::Message> {
        &self.sync
    }

    pub fn controller_mut(&mut self) -> &mut SyncController<K::Message> {
        &mut self.sync
    }

    pub fn config(&self) -> &RenderConfig {
        self.sync.config()
    }

    fn property_table() -> PropertyTable<Self> {
        let table = PropertyTable::<Self>::new()
            .topic(
                "Topic",
                "Topic to subscribe to.",
                |d| d.sync.config().topic.clone(),
                |d, topic| d.sync.set_topic(topic),
            )
            .color(
                "Color",
                "Color used when Override Color is set or the message carries no color.",
                |d| d.sync.config().color,
                |d, color| d.sync.set_color(color),
            )
            .bool(
                "Override Color",
                "Draw every vertex in Color instead of the message colors.",
                |d| d.sync.config().override_color,
                |d, enabled| d.sync.set_override_color(enabled),
            )
            .enumeration(
                "Render Operation",
                "Draw as line strips or as points.",
                &RenderMode::LABELS,
                |d| d.sync.config().mode.label(),
                |d, label| {
                    if let Some(mode) = RenderMode::from_label(label) {
                        d.sync.set_mode(mode);
                    }
                },
            );

        let table = if K::HAS_LOOP {
            table.bool(
                "Loop",
                "Close the line strip back to its first point.",
                |d| d.sync.config().close_loop,
                |d, close_loop| d.sync.set_close_loop(close_loop),
            )
        } else {
            table
        };

        table
            .float(
                "Point Size",
                "Size of each point in Points mode.",
                (0.0001, f32::MAX),
                |d| d.sync.config().point_size,
                |d, size| d.sync.set_point_size(size),
            )
            .float(
                "Alpha",
                "Opacity applied to every vertex.",
                (0.0, 1.0),
                |d| d.sync.config().alpha,
                |d, alpha| d.sync.set_alpha(alpha),
            )
            .float(
                "Z Position",
                "Offset along the fixed frame's z axis.",
                (f32::MIN, f32::MAX),
                |d| d.sync.config().z_offset,
                |d, z| d.sync.set_z_offset(z),
            )
    }
}

impl<K: MessageKind> Display for MessageDisplay<K> {
    fn name(&self) -> &str {
        self.sync.name()
    }

    fn type_name(&self) -> &'static str {
        K::TYPE_NAME
    }

    fn description(&self) -> &'static str {
        K::DESCRIPTION
    }

    fn is_enabled(&self) -> bool {
        self.sync.is_enabled()
    }

    fn on_enable(&mut self) -> VizResult<()> {
        self.sync.enable()
    }

    fn on_disable(&mut self) {
        self.sync.disable();
    }

    fn fixed_frame_changed(&mut self) {
        self.sync.fixed_frame_changed();
    }

    fn update(&mut self, dt: f64) {
        self.sync.update(dt);
    }

    fn reset(&mut self) {
        self.sync.reset();
    }

    fn status(&self) -> DisplayStatus {
        self.sync.status().clone()
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
