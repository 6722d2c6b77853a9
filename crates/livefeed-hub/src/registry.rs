use std::sync::Arc;

use dashmap::DashMap;

use crate::subscriber::{Subscriber, SubscriberId};

/// Set of currently connected subscribers, keyed by id.
///
/// Backed by a sharded `DashMap`: register and unregister lock one shard,
/// and `snapshot` copies the members out so a broadcast iterates a private
/// `Vec` rather than the live map.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, Arc<Subscriber>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Registering an id twice keeps the first handle.
    pub fn register(&self, subscriber: Arc<Subscriber>) {
        self.subscribers
            .entry(subscriber.id())
            .or_insert(subscriber);
    }

    /// Remove a subscriber. Only the call that actually removed it gets the
    /// handle back, which is what makes teardown run once.
    pub fn unregister(&self, id: &SubscriberId) -> Option<Arc<Subscriber>> {
        self.subscribers.remove(id).map(|(_, subscriber)| subscriber)
    }

    /// Copy of the current membership, each subscriber exactly once.
    pub fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.subscribers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn contains(&self, id: &SubscriberId) -> bool {
        self.subscribers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Ids of every member, for shutdown.
    pub fn ids(&self) -> Vec<SubscriberId> {
        self.subscribers.iter().map(|entry| *entry.key()).collect()
    }
}
