//! Built-in displays
//!
//! - `PolygonalMap`: polygonal map messages as line strips or points
//! - `Polyline`: planar polylines, optionally closed
//! - `Axes`: a coordinate triad at a reference frame origin
//!
//! Message displays share the [`SyncController`] pipeline: a latest-wins
//! slot filled by the bus, rebuilt into a [`polyviz_core::PrimitiveBatch`]
//! by the [`geometry`] builder and committed at the resolved fixed-frame pose.

pub mod axes;
pub mod config;
pub mod geometry;
pub mod message_display;
pub mod sync;

pub use axes::AxesDisplay;
pub use config::{RenderConfig, RenderMode};
pub use geometry::{GeometryError, PolygonSource};
pub use message_display::{
    MessageDisplay, MessageKind, PolygonalMapDisplay, PolygonalMapKind, PolylineDisplay,
    PolylineKind,
};
pub use sync::{SyncController, SyncOutcome};

use polyviz_core::DisplayRegistry;

/// Register every built-in display kind
pub fn register_builtin(registry: &mut DisplayRegistry) {
    registry.register(
        PolygonalMapKind::TYPE_NAME,
        PolygonalMapKind::DESCRIPTION,
        PolygonalMapDisplay::create,
    );
    registry.register(
        PolylineKind::TYPE_NAME,
        PolylineKind::DESCRIPTION,
        PolylineDisplay::create,
    );
    registry.register(axes::AXES_TYPE_NAME, axes::AXES_DESCRIPTION, AxesDisplay::create);
}

/// A registry holding the built-in display kinds
pub fn builtin_registry() -> DisplayRegistry {
    let mut registry = DisplayRegistry::new();
    register_builtin(&mut registry);
    registry
}
