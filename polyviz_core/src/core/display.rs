use crate::communication::TopicBus;
use crate::core::property::{PropertyDescriptor, PropertyObserver, PropertyValue};
use crate::error::VizResult;
use crate::frames::FrameService;
use crate::scene::SharedScene;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Compact one-line rendering of a message for trace output
pub trait LogSummary {
    /// Return a compact string representation suitable for logging
    fn log_summary(&self) -> String;
}

/// Severity of a display's current status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum StatusLevel {
    #[default]
    Ok,
    Warn,
    Error,
}

impl StatusLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::Warn => "Warn",
            Self::Error => "Error",
        }
    }
}

/// Status a display reports to the host
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayStatus {
    pub level: StatusLevel,
    pub message: String,
}

impl DisplayStatus {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Warn,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.level == StatusLevel::Ok
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.level.as_str())
        } else {
            write!(f, "{}: {}", self.level.as_str(), self.message)
        }
    }
}

/// Collaborators shared by every display of one viewer
#[derive(Clone)]
pub struct DisplayContext {
    pub scene: SharedScene,
    pub frames: Arc<dyn FrameService>,
    pub bus: Arc<TopicBus>,
    fixed_frame: Arc<RwLock<String>>,
    render_request: Arc<AtomicBool>,
}

impl DisplayContext {
    pub fn new(
        scene: SharedScene,
        frames: Arc<dyn FrameService>,
        bus: Arc<TopicBus>,
        fixed_frame: &str,
    ) -> Self {
        Self {
            scene,
            frames,
            bus,
            fixed_frame: Arc::new(RwLock::new(fixed_frame.to_string())),
            render_request: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Frame the scene is currently rendered relative to
    pub fn fixed_frame(&self) -> String {
        self.fixed_frame.read().clone()
    }

    /// Change the fixed frame; displays learn about it via `fixed_frame_changed`
    pub fn set_fixed_frame(&self, frame: &str) {
        *self.fixed_frame.write() = frame.to_string();
    }

    /// Signal that the scene changed and a redraw is owed
    pub fn request_render(&self) {
        self.render_request.store(true, Ordering::Release);
    }

    /// Consume a pending redraw request
    pub fn take_render_request(&self) -> bool {
        self.render_request.swap(false, Ordering::AcqRel)
    }
}

impl fmt::Debug for DisplayContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayContext")
            .field("fixed_frame", &self.fixed_frame())
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

/// Capability set every display kind implements
///
/// The host drives the lifecycle: `on_enable` / `on_disable`,
/// `fixed_frame_changed`, `reset` and a periodic `update`. A display is
/// always disabled before it is dropped when owned by a manager, but must
/// also tolerate being dropped while enabled.
pub trait Display: Send {
    /// Instance name (unique within a viewer)
    fn name(&self) -> &str;

    /// Registered type name, e.g. "PolygonalMap"
    fn type_name(&self) -> &'static str;

    /// One-line human readable description of the display kind
    fn description(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    fn on_enable(&mut self) -> VizResult<()>;

    fn on_disable(&mut self);

    /// The viewer's fixed frame changed
    fn fixed_frame_changed(&mut self);

    /// Periodic tick; `dt` is seconds since the previous tick
    fn update(&mut self, dt: f64);

    /// Drop accumulated state and geometry
    fn reset(&mut self);

    fn status(&self) -> DisplayStatus {
        DisplayStatus::ok()
    }

    fn property_descriptors(&self) -> Vec<PropertyDescriptor>;

    fn get_property(&self, name: &str) -> VizResult<PropertyValue>;

    fn set_property(&mut self, name: &str, value: PropertyValue) -> VizResult<()>;

    /// Install the callback notified after every property change
    fn set_property_observer(&mut self, observer: Option<PropertyObserver>);
}

impl LogSummary for f32 {
    fn log_summary(&self) -> String {
        format!("{:.3}", self)
    }
}

impl LogSummary for f64 {
    fn log_summary(&self) -> String {
        format!("{:.3}", self)
    }
}

impl LogSummary for u32 {
    fn log_summary(&self) -> String {
        self.to_string()
    }
}

impl LogSummary for u64 {
    fn log_summary(&self) -> String {
        self.to_string()
    }
}

impl LogSummary for bool {
    fn log_summary(&self) -> String {
        self.to_string()
    }
}

impl LogSummary for String {
    fn log_summary(&self) -> String {
        self.clone()
    }
}
