//! # polyviz
//!
//! Message-driven polygon displays for robotics scenes. Inbound polygonal
//! maps and polylines are captured from typed topics, placed in the
//! viewer's fixed frame through the transform tree and committed to a
//! scene host as line strips or points.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use polyviz::prelude::*;
//!
//! # fn main() -> AnyResult<()> {
//! let scene: SharedScene = Arc::new(Mutex::new(RecordingScene::new()));
//! let tf = SharedTfTree::new("map");
//! let bus = Arc::new(TopicBus::new());
//! let context = DisplayContext::new(scene, Arc::new(tf), Arc::clone(&bus), "map");
//!
//! let mut manager = VisualizationManager::new(context, builtin_registry());
//! manager.create_display("PolygonalMap", "obstacles")?;
//! manager.set_property("obstacles", "Topic", PropertyValue::String("obstacles".into()))?;
//! manager.set_display_enabled("obstacles", true)?;
//!
//! bus.publish("obstacles", PolygonalMap::new(vec![]))?;
//! manager.update(1.0 / 30.0);
//! # Ok(())
//! # }
//! ```

pub mod cli;

// Re-export the runtime crates
pub use polyviz_core;
pub use polyviz_core::{VizError, VizResult};

// Re-export standard library with alias
pub use polyviz_library as library;

/// The polyviz prelude - everything needed to drive a viewer
pub mod prelude {
    // Displays and the host driver
    pub use polyviz_core::{
        Display, DisplayContext, DisplayRegistry, DisplayStatus, PropertyValue,
        VisualizationManager, ViewerConfig,
    };

    // Plumbing
    pub use polyviz_core::{
        Color, FrameService, RecordingScene, SceneHost, SharedScene, TimeQuery, TopicBus,
    };

    // Error types
    pub use polyviz_core::{VizError, VizResult};

    // Built-in content
    pub use polyviz_library::displays::{builtin_registry, register_builtin, RenderMode};
    pub use polyviz_library::messages::*;
    pub use polyviz_library::tf::{SharedTfTree, TfTree};

    // Common traits
    pub use serde::{Deserialize, Serialize};

    // Common types
    pub use parking_lot::Mutex;
    pub use std::sync::Arc;
    pub use std::time::{Duration, Instant};

    pub use anyhow::{anyhow, bail, Context, Result as AnyResult};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get polyviz version
pub fn version() -> &'static str {
    VERSION
}
