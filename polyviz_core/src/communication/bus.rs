use crate::core::LogSummary;
use crate::error::{VizError, VizResult};
use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Handle returned by [`TopicBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Per-topic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicMetrics {
    pub messages_published: u64,
    pub messages_delivered: u64,
}

struct TopicEntry {
    type_id: TypeId,
    type_name: &'static str,
    subscribers: Vec<(SubscriptionId, Callback)>,
    published: AtomicU64,
    delivered: AtomicU64,
}

impl TopicEntry {
    fn new<M: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            type_name: type_name::<M>(),
            subscribers: Vec::new(),
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    fn check<M: 'static>(&self, topic: &str) -> VizResult<()> {
        if self.type_id == TypeId::of::<M>() {
            Ok(())
        } else {
            Err(VizError::TopicTypeMismatch {
                topic: topic.to_string(),
                bound: self.type_name,
                requested: type_name::<M>(),
            })
        }
    }
}

/// In-process publish/subscribe bus with named, typed topics
///
/// A topic is bound to one message type the first time it is used.
/// `publish` runs every subscriber callback synchronously on the calling
/// thread, so whichever thread publishes is the delivery thread.
pub struct TopicBus {
    topics: RwLock<HashMap<String, TopicEntry>>,
    next_id: AtomicU64,
}

impl Default for TopicBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TopicBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicBus")
            .field("topics", &self.topics())
            .finish_non_exhaustive()
    }
}

impl TopicBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback for every message published on `topic`
    pub fn subscribe<M, F>(&self, topic: &str, callback: F) -> VizResult<SubscriptionId>
    where
        M: Send + Sync + 'static,
        F: Fn(&M) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let erased: Callback = Arc::new(move |msg: &dyn Any| {
            if let Some(msg) = msg.downcast_ref::<M>() {
                callback(msg);
            }
        });

        let mut topics = self.topics.write();
        let entry = topics
            .entry(topic.to_string())
            .or_insert_with(TopicEntry::new::<M>);
        entry.check::<M>(topic)?;
        entry.subscribers.push((id, erased));

        trace!(topic, %id, "subscribed");
        Ok(id)
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut topics = self.topics.write();
        for (topic, entry) in topics.iter_mut() {
            if let Some(pos) = entry.subscribers.iter().position(|(sub, _)| *sub == id) {
                entry.subscribers.remove(pos);
                trace!(topic = topic.as_str(), %id, "unsubscribed");
                return true;
            }
        }
        false
    }

    /// Deliver `msg` to every subscriber of `topic`
    ///
    /// Returns the number of subscribers reached.
    pub fn publish<M>(&self, topic: &str, msg: M) -> VizResult<usize>
    where
        M: LogSummary + Send + Sync + 'static,
    {
        if !self.topics.read().contains_key(topic) {
            self.topics
                .write()
                .entry(topic.to_string())
                .or_insert_with(TopicEntry::new::<M>);
        }

        // Callbacks run outside the bus lock so they may (un)subscribe.
        let callbacks: Vec<Callback> = {
            let topics = self.topics.read();
            let entry = match topics.get(topic) {
                Some(entry) => entry,
                None => return Ok(0),
            };
            entry.check::<M>(topic)?;
            entry.published.fetch_add(1, Ordering::Relaxed);
            entry
                .delivered
                .fetch_add(entry.subscribers.len() as u64, Ordering::Relaxed);
            entry.subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };

        trace!(topic, summary = %msg.log_summary(), subscribers = callbacks.len(), "publish");
        for callback in &callbacks {
            callback(&msg);
        }
        Ok(callbacks.len())
    }

    /// Number of live subscriptions on `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .get(topic)
            .map(|entry| entry.subscribers.len())
            .unwrap_or(0)
    }

    /// Counter snapshot for `topic`
    pub fn metrics(&self, topic: &str) -> Option<TopicMetrics> {
        self.topics.read().get(topic).map(|entry| TopicMetrics {
            messages_published: entry.published.load(Ordering::Relaxed),
            messages_delivered: entry.delivered.load(Ordering::Relaxed),
        })
    }

    /// All known topic names, sorted
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.read().keys().cloned().collect();
        names.sort();
        names
    }
}
