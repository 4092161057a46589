use super::tree::{TfResult, TfTree};
use nalgebra::Isometry3;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use polyviz_core::{FrameService, StampedPose, TimeQuery, VizResult};
use std::sync::Arc;

/// Thread-safe handle to a [`TfTree`]
///
/// Broadcasters write through [`SharedTfTree::write`]; displays query it
/// through the [`FrameService`] impl.
#[derive(Debug, Clone)]
pub struct SharedTfTree {
    inner: Arc<RwLock<TfTree>>,
}

impl SharedTfTree {
    pub fn new(root: impl Into<String>) -> Self {
        Self::from_tree(TfTree::new(root))
    }

    pub fn from_tree(tree: TfTree) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, TfTree> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, TfTree> {
        self.inner.write()
    }

    pub fn add_static_transform(
        &self,
        parent: &str,
        child: &str,
        transform: Isometry3<f64>,
    ) -> TfResult<()> {
        self.inner.write().add_static_transform(parent, child, transform)
    }

    pub fn add_transform(
        &self,
        parent: &str,
        child: &str,
        transform: Isometry3<f64>,
        timestamp: u64,
    ) -> TfResult<()> {
        self.inner
            .write()
            .add_transform(parent, child, transform, timestamp)
    }

    /// Drop dynamic samples older than `timestamp` (newest per frame is kept)
    pub fn prune_before(&self, timestamp: u64) {
        self.inner.write().prune_before(timestamp);
    }
}

impl FrameService for TfTree {
    fn can_transform(&self, target: &str, source: &str, time: TimeQuery) -> bool {
        TfTree::can_transform(self, target, source, time)
    }

    fn transform_pose(
        &self,
        target: &str,
        pose: &StampedPose,
        time: TimeQuery,
    ) -> VizResult<StampedPose> {
        let target_from_source = self.lookup_transform(target, &pose.frame_id, time)?;
        Ok(StampedPose {
            frame_id: target.to_string(),
            stamp: pose.stamp,
            pose: target_from_source * pose.pose,
        })
    }
}

impl FrameService for SharedTfTree {
    fn can_transform(&self, target: &str, source: &str, time: TimeQuery) -> bool {
        self.inner.read().can_transform(target, source, time)
    }

    fn transform_pose(
        &self,
        target: &str,
        pose: &StampedPose,
        time: TimeQuery,
    ) -> VizResult<StampedPose> {
        FrameService::transform_pose(&*self.inner.read(), target, pose, time)
    }
}
