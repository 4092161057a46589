//! Transform (TF) system
//!
//! Coordinate frame management for tracking relationships between frames
//! over time, and the resolver displays use to place geometry in the
//! fixed frame.
//!
//! # Example
//!
//! ```rust,ignore
//! use polyviz_library::tf::{FrameResolver, SharedTfTree};
//!
//! let tf = SharedTfTree::new("map");
//! tf.add_static_transform("map", "odom", Isometry3::translation(1.0, 0.0, 0.0))?;
//!
//! let resolver = FrameResolver::new(Arc::new(tf.clone()));
//! let result = resolver.resolve("odom", "map", TimeQuery::Latest);
//! ```

mod buffer;
mod resolver;
mod shared;
mod tree;

pub use buffer::{CircularBuffer, TransformBuffer};
pub use resolver::{FrameResolver, TransformResult};
pub use shared::SharedTfTree;
pub use tree::{FrameNode, FrameTransform, TfError, TfResult, TfTree};

/// Get current timestamp in nanoseconds
pub fn timestamp_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
