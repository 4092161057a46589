//! Coordinate frame service contract
//!
//! Displays resolve poses through a [`FrameService`] without knowing how
//! the frame tree is maintained.

use crate::error::VizResult;
use nalgebra::Isometry3;
use std::fmt;

/// Which point in time a frame query refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeQuery {
    /// Most recent data available for every frame on the path
    #[default]
    Latest,
    /// A specific timestamp in nanoseconds
    At(u64),
}

impl fmt::Display for TimeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeQuery::Latest => write!(f, "latest"),
            TimeQuery::At(ns) => write!(f, "{}ns", ns),
        }
    }
}

/// A pose expressed in a named frame
#[derive(Debug, Clone, PartialEq)]
pub struct StampedPose {
    pub frame_id: String,
    pub stamp: TimeQuery,
    pub pose: Isometry3<f64>,
}

impl StampedPose {
    pub fn new(frame_id: impl Into<String>, stamp: TimeQuery, pose: Isometry3<f64>) -> Self {
        Self {
            frame_id: frame_id.into(),
            stamp,
            pose,
        }
    }
}

/// Frame tree queries a display needs
pub trait FrameService: Send + Sync {
    /// Whether `source` can be expressed in `target` at `time`
    fn can_transform(&self, target: &str, source: &str, time: TimeQuery) -> bool;

    /// Re-express `pose` in `target`
    fn transform_pose(&self, target: &str, pose: &StampedPose, time: TimeQuery)
        -> VizResult<StampedPose>;
}
