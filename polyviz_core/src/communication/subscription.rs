use super::bus::{SubscriptionId, TopicBus};
use super::slot::LatestSlot;
use crate::error::VizResult;
use std::sync::Arc;
use tracing::debug;

/// Routes messages from one bus topic into a [`LatestSlot`]
///
/// The adapter only stores arrivals; it never transforms or renders them.
/// Dropping the adapter unsubscribes.
pub struct Subscription<M> {
    bus: Arc<TopicBus>,
    slot: Arc<LatestSlot<M>>,
    active: Option<(String, SubscriptionId)>,
}

impl<M> Subscription<M>
where
    M: Clone + Send + Sync + 'static,
{
    pub fn new(bus: Arc<TopicBus>, slot: Arc<LatestSlot<M>>) -> Self {
        Self {
            bus,
            slot,
            active: None,
        }
    }

    /// Start delivery from `topic`, dropping any previous subscription first
    ///
    /// An empty topic leaves the adapter unsubscribed and returns `Ok(false)`.
    pub fn subscribe(&mut self, topic: &str) -> VizResult<bool> {
        self.unsubscribe();
        if topic.is_empty() {
            return Ok(false);
        }

        let slot = Arc::clone(&self.slot);
        let generation = slot.generation();
        let id = self.bus.subscribe::<M, _>(topic, move |msg| {
            // A callback cloned by an in-flight publish may outlive unsubscribe;
            // the slot rejects it once the generation has moved on.
            slot.deliver_if(generation, msg.clone());
        })?;

        debug!(topic, %id, "subscription started");
        self.active = Some((topic.to_string(), id));
        Ok(true)
    }

    /// Stop delivery; calling it while unsubscribed is a no-op
    pub fn unsubscribe(&mut self) {
        self.slot.retire();
        if let Some((topic, id)) = self.active.take() {
            self.bus.unsubscribe(id);
            debug!(topic = topic.as_str(), %id, "subscription stopped");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.active.is_some()
    }

    /// Topic currently subscribed to, if any
    pub fn topic(&self) -> Option<&str> {
        self.active.as_ref().map(|(topic, _)| topic.as_str())
    }

    pub fn slot(&self) -> &Arc<LatestSlot<M>> {
        &self.slot
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        self.slot.retire();
        if let Some((_, id)) = self.active.take() {
            self.bus.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    fn adapter() -> (Arc<TopicBus>, Subscription<String>) {
        let bus = Arc::new(TopicBus::new());
        let slot = Arc::new(LatestSlot::new());
        let sub = Subscription::new(Arc::clone(&bus), slot);
        (bus, sub)
    }

    #[test]
    fn test_delivery_fills_slot() {
        let (bus, mut sub) = adapter();
        assert!(sub.subscribe("map").unwrap());
        assert_eq!(sub.topic(), Some("map"));

        bus.publish("map", "first".to_string()).unwrap();
        bus.publish("map", "second".to_string()).unwrap();

        assert!(sub.slot().has_pending());
        assert_eq!(sub.slot().lock().get().map(String::as_str), Some("second"));
    }

    #[test]
    fn test_empty_topic_skips_subscription() {
        let (bus, mut sub) = adapter();
        sub.subscribe("map").unwrap();
        assert!(!sub.subscribe("").unwrap());
        assert!(!sub.is_subscribed());
        assert_eq!(bus.subscriber_count("map"), 0);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let (bus, mut sub) = adapter();
        sub.subscribe("map").unwrap();
        sub.unsubscribe();
        sub.unsubscribe();

        bus.publish("map", "late".to_string()).unwrap();
        assert!(sub.slot().is_empty());
    }

    #[test]
    fn test_resubscribe_moves_topic() {
        let (bus, mut sub) = adapter();
        sub.subscribe("a").unwrap();
        sub.subscribe("b").unwrap();
        assert_eq!(bus.subscriber_count("a"), 0);
        assert_eq!(bus.subscriber_count("b"), 1);

        bus.publish("a", "ignored".to_string()).unwrap();
        assert!(!sub.slot().has_pending());
    }

    #[test]
    fn test_no_stale_delivery_after_unsubscribe_and_clear() {
        let (bus, mut sub) = adapter();
        let running = Arc::new(AtomicBool::new(true));
        let producer = {
            let bus = Arc::clone(&bus);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                let payload = "x".repeat(1 << 20);
                while running.load(Ordering::Acquire) {
                    bus.publish("map", payload.clone()).unwrap();
                }
            })
        };

        for _ in 0..50 {
            sub.subscribe("map").unwrap();
            while !sub.slot().has_pending() {
                thread::yield_now();
            }
            sub.unsubscribe();
            sub.slot().clear();
            thread::sleep(Duration::from_millis(2));
            assert!(sub.slot().is_empty());
            assert!(!sub.slot().has_pending());
        }

        running.store(false, Ordering::Release);
        producer.join().unwrap();
    }

    #[test]
    fn test_drop_unsubscribes() {
        let (bus, mut sub) = adapter();
        sub.subscribe("map").unwrap();
        drop(sub);
        assert_eq!(bus.subscriber_count("map"), 0);
    }
}
