//! Message delivery for displays
//!
//! - [`TopicBus`]: named, typed in-process topics
//! - [`LatestSlot`]: latest-wins mailbox a display reads from
//! - [`Subscription`]: glue that routes a topic into a slot

pub mod bus;
pub mod slot;
pub mod subscription;

pub use bus::{SubscriptionId, TopicBus, TopicMetrics};
pub use slot::{LatestSlot, SlotGuard};
pub use subscription::Subscription;
