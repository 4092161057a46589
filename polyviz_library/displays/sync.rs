//! Scene sync controller
//!
//! Owns the pending-message slot, the subscription feeding it and the
//! scene attachment, and runs the synchronization pass:
//! read slot -> build geometry -> resolve frame -> commit -> mark consumed.
//!
//! The slot lock is held for the entire pass so a message arriving
//! mid-build can never be mixed into the geometry being committed.

use super::config::{RenderConfig, RenderMode};
use super::geometry::{self, PolygonSource};
use crate::tf::{FrameResolver, TransformResult};
use nalgebra::{Isometry3, Vector3};
use polyviz_core::{
    Color, DisplayContext, DisplayStatus, LatestSlot, NodeId, SceneAttachment, StampedPose,
    Subscription, TimeQuery, VizResult,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Frame polygon messages are declared in
pub const DEFAULT_SOURCE_FRAME: &str = "map";

/// What a call to [`SyncController::synchronize`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No message has been received since the last clear
    NoMessage,
    /// Geometry committed; `transform_resolved` is false when the identity fallback was used
    Committed { transform_resolved: bool },
}

/// Keeps one display's scene attachment in step with its messages and configuration
pub struct SyncController<M> {
    name: String,
    context: DisplayContext,
    resolver: FrameResolver,
    config: RenderConfig,
    source_frame: String,
    slot: Arc<LatestSlot<M>>,
    // Field order matters: unsubscribe before the attachment is released.
    subscription: Subscription<M>,
    attachment: SceneAttachment,
    enabled: bool,
    status: DisplayStatus,
    passes: u64,
}

impl<M> SyncController<M>
where
    M: PolygonSource + Clone + Send + Sync + 'static,
{
    /// Create the controller and its scene node
    ///
    /// Fails if the scene host cannot allocate a node.
    pub fn new(name: &str, context: DisplayContext, config: RenderConfig) -> VizResult<Self> {
        let attachment = SceneAttachment::new(context.scene.clone())?;
        let slot = Arc::new(LatestSlot::new());
        let subscription = Subscription::new(Arc::clone(&context.bus), Arc::clone(&slot));

        Ok(Self {
            name: name.to_string(),
            resolver: FrameResolver::new(Arc::clone(&context.frames)),
            context,
            config,
            source_frame: DEFAULT_SOURCE_FRAME.to_string(),
            slot,
            subscription,
            attachment,
            enabled: false,
            status: DisplayStatus::ok(),
            passes: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn status(&self) -> &DisplayStatus {
        &self.status
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_subscribed()
    }

    /// The pending-message slot deliveries land in
    pub fn slot(&self) -> &Arc<LatestSlot<M>> {
        &self.slot
    }

    pub fn node(&self) -> NodeId {
        self.attachment.node()
    }

    /// Completed synchronization passes
    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    pub fn source_frame(&self) -> &str {
        &self.source_frame
    }

    /// Frame the message geometry is declared in
    pub fn set_source_frame(&mut self, frame: &str) {
        self.source_frame = frame.to_string();
        self.recompute();
    }

    pub fn enable(&mut self) -> VizResult<()> {
        if self.enabled {
            return Ok(());
        }
        self.subscribe()?;
        self.enabled = true;
        self.attachment.set_visible(true);
        info!(display = %self.name, topic = %self.config.topic, "display enabled");
        self.recompute();
        Ok(())
    }

    /// Unsubscribe, drop pending data and committed geometry, hide the node
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.subscription.unsubscribe();
        self.clear();
        self.attachment.set_visible(false);
        self.enabled = false;
        info!(display = %self.name, "display disabled");
    }

    /// Drop committed geometry and the pending flag; the last message is kept
    /// so a later property edit can redraw it in the new frame
    pub fn fixed_frame_changed(&mut self) {
        debug!(
            display = %self.name,
            fixed_frame = %self.context.fixed_frame(),
            "clearing for new fixed frame"
        );
        self.slot.lock().mark_consumed();
        self.attachment.clear();
        self.context.request_render();
    }

    pub fn reset(&mut self) {
        self.clear();
        self.status = DisplayStatus::ok();
    }

    /// Periodic tick: synchronize only when a new message is waiting
    pub fn update(&mut self, _dt: f64) {
        if self.enabled && self.slot.has_pending() {
            // Failures are logged and reflected in the status by the pass itself
            let _ = self.synchronize();
        }
    }

    /// Drop the pending message and every committed primitive
    pub fn clear(&mut self) {
        self.slot.clear();
        self.attachment.clear();
        self.context.request_render();
    }

    fn subscribe(&mut self) -> VizResult<()> {
        match self.subscription.subscribe(&self.config.topic) {
            Ok(true) => {
                debug!(display = %self.name, topic = %self.config.topic, "subscribed");
                Ok(())
            }
            Ok(false) => {
                debug!(display = %self.name, "no topic set, not subscribing");
                Ok(())
            }
            Err(e) => {
                error!(
                    display = %self.name,
                    topic = %self.config.topic,
                    error = %e,
                    "subscribe failed"
                );
                self.status = DisplayStatus::error(e.to_string());
                Err(e)
            }
        }
    }

    /// Run one synchronization pass against the latest received message
    ///
    /// A no-op returning [`SyncOutcome::NoMessage`] when nothing has been
    /// received. An unavailable transform degrades to the identity pose and
    /// a Warn status. A malformed message leaves the previously committed
    /// geometry in place and fails only this pass.
    pub fn synchronize(&mut self) -> VizResult<SyncOutcome> {
        let slot = Arc::clone(&self.slot);
        let mut guard = slot.lock();
        let message = match guard.get() {
            Some(message) => message,
            None => return Ok(SyncOutcome::NoMessage),
        };

        let close_loop = self.config.close_loop && self.config.mode == RenderMode::Lines;
        let built = geometry::build(&message.polygons(close_loop), &self.config);
        let batch = match built {
            Ok(batch) => batch,
            Err(e) => {
                guard.mark_consumed();
                error!(
                    display = %self.name,
                    error = %e,
                    "malformed message, keeping previous geometry"
                );
                self.status = DisplayStatus::error(e.to_string());
                return Err(e.into());
            }
        };

        let fixed_frame = self.context.fixed_frame();
        let z_offset = self.config.z_offset;
        let origin = StampedPose::new(
            self.source_frame.as_str(),
            TimeQuery::Latest,
            Isometry3::translation(0.0, 0.0, f64::from(z_offset)),
        );
        let result = self
            .resolver
            .resolve_pose(&origin, &fixed_frame, TimeQuery::Latest);
        let (position, orientation) = result.or_identity(Vector3::new(0.0, 0.0, z_offset));

        let transform_resolved = match &result {
            TransformResult::Resolved { .. } => {
                self.status = DisplayStatus::ok();
                true
            }
            TransformResult::Unavailable { reason } => {
                warn!(
                    display = %self.name,
                    source = %self.source_frame,
                    fixed_frame = %fixed_frame,
                    reason = %reason,
                    "transform unavailable, drawing untransformed"
                );
                self.status = DisplayStatus::warn(reason.clone());
                false
            }
        };

        self.attachment.commit(&batch, position, orientation);
        guard.mark_consumed();
        drop(guard);

        self.passes += 1;
        self.context.request_render();
        debug!(
            display = %self.name,
            vertices = batch.vertex_count(),
            transform_resolved,
            "synchronized"
        );
        Ok(SyncOutcome::Committed { transform_resolved })
    }

    /// Re-run the pass after a configuration edit; deferred while disabled
    fn recompute(&mut self) {
        if !self.enabled {
            return;
        }
        let _ = self.synchronize();
        self.context.request_render();
    }

    /// Change topic: unsubscribe, clear, and resubscribe when enabled
    pub fn set_topic(&mut self, topic: &str) -> VizResult<()> {
        if self.config.topic == topic && (self.subscription.is_subscribed() || !self.enabled) {
            return Ok(());
        }
        self.config.topic = topic.to_string();
        if self.enabled {
            self.subscription.unsubscribe();
            self.clear();
            self.subscribe()?;
        }
        Ok(())
    }

    pub fn set_color(&mut self, color: Color) {
        self.config.color = color;
        self.recompute();
    }

    pub fn set_override_color(&mut self, enabled: bool) {
        self.config.override_color = enabled;
        self.recompute();
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.config.mode = mode;
        self.recompute();
    }

    pub fn set_point_size(&mut self, size: f32) {
        self.config.point_size = size;
        self.recompute();
    }

    pub fn set_z_offset(&mut self, z: f32) {
        self.config.z_offset = z;
        self.recompute();
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.config.alpha = alpha;
        self.recompute();
    }

    pub fn set_close_loop(&mut self, close_loop: bool) {
        self.config.close_loop = close_loop;
        self.recompute();
    }
}
