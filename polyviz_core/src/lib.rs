//! # polyviz core
//!
//! Runtime plumbing shared by every polyviz display:
//!
//! - **Communication**: typed in-process topics and the latest-wins mailbox
//! - **Scene**: the scene-graph host contract and an in-memory recording host
//! - **Frames**: the coordinate frame service contract
//! - **Displays**: the `Display` capability trait and declarative property tables
//! - **Manager**: the host driver owning displays, plus YAML viewer configuration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use polyviz_core::{DisplayContext, DisplayRegistry, VisualizationManager, ViewerConfig};
//!
//! let context = DisplayContext::new(scene, frames, bus, "map");
//! let mut manager = VisualizationManager::from_config(context, registry, &config)?;
//! loop {
//!     manager.update(1.0 / manager.update_rate_hz());
//!     if manager.take_render_request() {
//!         // redraw
//!     }
//! }
//! ```

pub mod communication;
pub mod core;
pub mod error;
pub mod frames;
pub mod manager;
pub mod params;
pub mod scene;

pub use communication::{LatestSlot, Subscription, SubscriptionId, TopicBus};
pub use crate::core::{
    Display, DisplayContext, DisplayStatus, LogSummary, PropertyDescriptor, PropertyKind,
    PropertyObserver, PropertyTable, PropertyValue, StatusLevel,
};
pub use error::{VizError, VizResult};
pub use frames::{FrameService, StampedPose, TimeQuery};
pub use manager::{DisplayFactory, DisplayRegistry, VisualizationManager};
pub use params::{DisplayEntry, ViewerConfig};
pub use scene::{
    Color, ColorRgba, ColoredVertex, LineStrip, NodeId, PrimitiveBatch, RecordedNode,
    RecordingScene, SceneAttachment, SceneHost, SharedScene,
};
