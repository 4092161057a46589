//! Coordinate frame resolution for displays
//!
//! Wraps a [`FrameService`] and turns every outcome into a
//! [`TransformResult`] value. Callers branch on it and fall back to the
//! identity transform when the frame is unavailable.

use nalgebra::{Isometry3, Quaternion, UnitQuaternion, Vector3};
use polyviz_core::{FrameService, StampedPose, TimeQuery};
use std::sync::Arc;

/// Outcome of resolving a pose into the fixed frame
#[derive(Debug, Clone, PartialEq)]
pub enum TransformResult {
    Resolved {
        position: Vector3<f32>,
        orientation: UnitQuaternion<f32>,
    },
    Unavailable {
        reason: String,
    },
}

impl TransformResult {
    pub fn is_resolved(&self) -> bool {
        matches!(self, TransformResult::Resolved { .. })
    }

    /// The resolved pose, or `fallback_position` with identity orientation
    pub fn or_identity(&self, fallback_position: Vector3<f32>) -> (Vector3<f32>, UnitQuaternion<f32>) {
        match self {
            TransformResult::Resolved {
                position,
                orientation,
            } => (*position, *orientation),
            TransformResult::Unavailable { .. } => (fallback_position, UnitQuaternion::identity()),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            TransformResult::Unavailable { reason } => Some(reason),
            TransformResult::Resolved { .. } => None,
        }
    }
}

fn to_scene_pose(pose: &Isometry3<f64>) -> (Vector3<f32>, UnitQuaternion<f32>) {
    let t = pose.translation.vector;
    let q = pose.rotation.quaternion();
    (
        Vector3::new(t.x as f32, t.y as f32, t.z as f32),
        UnitQuaternion::from_quaternion(Quaternion::new(
            q.w as f32, q.i as f32, q.j as f32, q.k as f32,
        )),
    )
}

/// Resolves frames through a [`FrameService`] without ever failing hard
#[derive(Clone)]
pub struct FrameResolver {
    frames: Arc<dyn FrameService>,
}

impl FrameResolver {
    pub fn new(frames: Arc<dyn FrameService>) -> Self {
        Self { frames }
    }

    /// Pose of `source`'s origin expressed in `target`
    pub fn resolve(&self, source: &str, target: &str, time: TimeQuery) -> TransformResult {
        let origin = StampedPose::new(source, time, Isometry3::identity());
        self.resolve_pose(&origin, target, time)
    }

    /// `pose` re-expressed in `target`
    ///
    /// Availability is queried first; a failed transform is reported as
    /// [`TransformResult::Unavailable`] with the reason.
    pub fn resolve_pose(&self, pose: &StampedPose, target: &str, time: TimeQuery) -> TransformResult {
        if pose.frame_id.is_empty() || target.is_empty() {
            return TransformResult::Unavailable {
                reason: "empty frame id".to_string(),
            };
        }

        if !self.frames.can_transform(target, &pose.frame_id, time) {
            return TransformResult::Unavailable {
                reason: format!(
                    "No transform from [{}] to frame [{}]",
                    pose.frame_id, target
                ),
            };
        }

        match self.frames.transform_pose(target, pose, time) {
            Ok(resolved) => {
                let (position, orientation) = to_scene_pose(&resolved.pose);
                TransformResult::Resolved {
                    position,
                    orientation,
                }
            }
            Err(e) => TransformResult::Unavailable {
                reason: e.to_string(),
            },
        }
    }
}
