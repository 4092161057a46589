//! # polyviz library
//!
//! Standard content for polyviz viewers:
//!
//! - **Messages**: polygonal maps and polylines
//! - **TF**: the transform tree and the frame resolver displays use
//! - **Displays**: polygonal map, polyline and axes displays
//!
//! ## Usage
//!
//! ```rust,ignore
//! use polyviz_library::displays::builtin_registry;
//! use polyviz_library::messages::PolygonalMap;
//!
//! let registry = builtin_registry();
//! let mut manager = VisualizationManager::new(context, registry);
//! manager.create_display("PolygonalMap", "obstacles")?;
//! ```

pub mod displays;
pub mod messages;
pub mod tf;

pub use displays::{
    builtin_registry, register_builtin, AxesDisplay, PolygonalMapDisplay, PolylineDisplay,
    RenderConfig, RenderMode, SyncController, SyncOutcome,
};
pub use messages::{Point2, Point3, Polygon, PolygonalMap, Polyline};
pub use tf::{FrameResolver, SharedTfTree, TfTree, TransformResult};
