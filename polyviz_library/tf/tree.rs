//! TF Tree - Frame hierarchy and transform lookup
//!
//! Every frame stores the transform from its parent to itself
//! (`parent_from_child`), either fixed or as a time-buffered series.

use super::buffer::TransformBuffer;
use nalgebra::Isometry3;
use polyviz_core::{TimeQuery, VizError};
use std::collections::HashMap;
use thiserror::Error;

/// Default buffer capacity (samples per dynamic frame)
const DEFAULT_BUFFER_CAPACITY: usize = 1000;

/// TF errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TfError {
    #[error("Frame '{0}' not found")]
    FrameNotFound(String),

    #[error("Parent frame '{0}' does not exist")]
    ParentNotFound(String),

    #[error("No common ancestor found between '{0}' and '{1}'")]
    NoCommonAncestor(String, String),

    #[error("Attaching '{0}' under '{1}' would create a cycle")]
    CycleDetected(String, String),

    #[error("Transform for frame '{frame}' not available at {time}")]
    TransformNotAvailable { frame: String, time: TimeQuery },
}

impl From<TfError> for VizError {
    fn from(err: TfError) -> Self {
        VizError::Transform(err.to_string())
    }
}

/// Result type for TF operations
pub type TfResult<T> = Result<T, TfError>;

/// How a frame's transform is stored
#[derive(Debug, Clone)]
pub enum FrameTransform {
    Static(Isometry3<f64>),
    Dynamic(TransformBuffer),
}

/// A node in the transform tree
#[derive(Debug, Clone)]
pub struct FrameNode {
    pub name: String,
    /// Parent frame name (None for root)
    pub parent: Option<String>,
    pub transform: FrameTransform,
}

impl FrameNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            transform: FrameTransform::Static(Isometry3::identity()),
        }
    }

    /// `parent_from_child` at the requested time
    pub fn transform_at(&self, time: TimeQuery) -> Option<Isometry3<f64>> {
        match (&self.transform, time) {
            (FrameTransform::Static(tf), _) => Some(*tf),
            (FrameTransform::Dynamic(buffer), TimeQuery::Latest) => buffer.latest().map(|(_, tf)| tf),
            (FrameTransform::Dynamic(buffer), TimeQuery::At(ts)) => buffer.sample_at(ts),
        }
    }
}

/// Transform tree for managing coordinate frames
#[derive(Debug)]
pub struct TfTree {
    frames: HashMap<String, FrameNode>,
    root: String,
    buffer_capacity: usize,
}

impl Default for TfTree {
    fn default() -> Self {
        Self::new("map")
    }
}

impl TfTree {
    /// Create a new TF tree with the given root frame name
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let mut frames = HashMap::new();
        frames.insert(root.clone(), FrameNode::new(&root));

        Self {
            frames,
            root,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn has_frame(&self, name: &str) -> bool {
        self.frames.contains_key(name)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Add or replace a fixed transform from `parent` to `child`
    pub fn add_static_transform(
        &mut self,
        parent: &str,
        child: &str,
        transform: Isometry3<f64>,
    ) -> TfResult<()> {
        self.attach(parent, child)?;
        if let Some(frame) = self.frames.get_mut(child) {
            frame.transform = FrameTransform::Static(transform);
        }
        Ok(())
    }

    /// Record a timestamped transform from `parent` to `child`
    ///
    /// A frame that was static becomes dynamic.
    pub fn add_transform(
        &mut self,
        parent: &str,
        child: &str,
        transform: Isometry3<f64>,
        timestamp: u64,
    ) -> TfResult<()> {
        self.attach(parent, child)?;
        let capacity = self.buffer_capacity;
        if let Some(frame) = self.frames.get_mut(child) {
            if let FrameTransform::Dynamic(buffer) = &mut frame.transform {
                buffer.push((timestamp, transform));
            } else {
                let mut buffer = TransformBuffer::new(capacity);
                buffer.push((timestamp, transform));
                frame.transform = FrameTransform::Dynamic(buffer);
            }
        }
        Ok(())
    }

    /// Ensure `child` exists under `parent`, re-parenting it if needed
    fn attach(&mut self, parent: &str, child: &str) -> TfResult<()> {
        if !self.frames.contains_key(parent) {
            return Err(TfError::ParentNotFound(parent.to_string()));
        }
        if child == self.root || self.is_ancestor(child, parent) {
            return Err(TfError::CycleDetected(child.to_string(), parent.to_string()));
        }

        let frame = self
            .frames
            .entry(child.to_string())
            .or_insert_with(|| FrameNode::new(child));
        frame.parent = Some(parent.to_string());
        Ok(())
    }

    /// Whether `ancestor` is `frame` or lies on its path to the root
    fn is_ancestor(&self, ancestor: &str, frame: &str) -> bool {
        let mut current = Some(frame);
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            current = self.frames.get(name).and_then(|f| f.parent.as_deref());
        }
        false
    }

    /// Frames from `frame` up to the root, inclusive
    fn path_to_root(&self, frame: &str) -> TfResult<Vec<&str>> {
        let mut path = Vec::new();
        let mut current = self
            .frames
            .get(frame)
            .ok_or_else(|| TfError::FrameNotFound(frame.to_string()))?;
        path.push(current.name.as_str());
        while let Some(parent) = current.parent.as_deref() {
            current = self
                .frames
                .get(parent)
                .ok_or_else(|| TfError::FrameNotFound(parent.to_string()))?;
            path.push(current.name.as_str());
        }
        Ok(path)
    }

    /// `ancestor_from_frame` for each prefix of `path` (excluding the ancestor itself)
    fn compose_up(&self, path: &[&str], time: TimeQuery) -> TfResult<Isometry3<f64>> {
        let mut acc = Isometry3::identity();
        for name in path {
            let frame = self
                .frames
                .get(*name)
                .ok_or_else(|| TfError::FrameNotFound(name.to_string()))?;
            let parent_from_child = frame.transform_at(time).ok_or_else(|| {
                TfError::TransformNotAvailable {
                    frame: name.to_string(),
                    time,
                }
            })?;
            acc = parent_from_child * acc;
        }
        Ok(acc)
    }

    /// Transform mapping coordinates in `source` into `target` (`target_from_source`)
    pub fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        time: TimeQuery,
    ) -> TfResult<Isometry3<f64>> {
        let source_path = self.path_to_root(source)?;
        let target_path = self.path_to_root(target)?;
        if source == target {
            return Ok(Isometry3::identity());
        }

        let (i, j) = source_path
            .iter()
            .enumerate()
            .find_map(|(i, s)| target_path.iter().position(|t| t == s).map(|j| (i, j)))
            .ok_or_else(|| TfError::NoCommonAncestor(source.to_string(), target.to_string()))?;

        let ancestor_from_source = self.compose_up(&source_path[..i], time)?;
        let ancestor_from_target = self.compose_up(&target_path[..j], time)?;
        Ok(ancestor_from_target.inverse() * ancestor_from_source)
    }

    /// Whether [`TfTree::lookup_transform`] would succeed
    pub fn can_transform(&self, target: &str, source: &str, time: TimeQuery) -> bool {
        self.lookup_transform(target, source, time).is_ok()
    }

    /// Drop dynamic samples older than `timestamp`
    ///
    /// The newest sample of each dynamic frame is always kept so `Latest`
    /// lookups keep working for frames that stopped broadcasting.
    pub fn prune_before(&mut self, timestamp: u64) {
        for frame in self.frames.values_mut() {
            if let FrameTransform::Dynamic(buffer) = &mut frame.transform {
                buffer.prune_before(timestamp);
            }
        }
    }
}
