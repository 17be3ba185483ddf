use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
/// Lane event bus
///
/// Fan-out of [`LaneEvent`]s from the bridge to displays, loggers and the
/// venue link. Publishing never blocks the scoring path: a full subscriber
/// misses the event, a disconnected one is dropped.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::events::LaneEvent;

/// Subscriber ID for tracking subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

struct Subscriber {
    id: SubscriberId,
    sender: Sender<LaneEvent>,
}

#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    next_id: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe with an unbounded queue.
    pub fn subscribe(&self) -> (Receiver<LaneEvent>, SubscriberId) {
        let (tx, rx) = unbounded();
        (rx, self.register(tx))
    }

    /// Subscribe with room for `capacity` undelivered events.
    pub fn subscribe_bounded(&self, capacity: usize) -> (Receiver<LaneEvent>, SubscriberId) {
        let (tx, rx) = bounded(capacity.max(1));
        (rx, self.register(tx))
    }

    fn register(&self, sender: Sender<LaneEvent>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push(Subscriber { id, sender });
        id
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().retain(|s| s.id != id);
    }

    pub fn publish(&self, event: LaneEvent) {
        let mut closed = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for subscriber in subscribers.iter() {
                match subscriber.sender.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::trace!("Subscriber {:?} full, dropped: {}", subscriber.id, event.description());
                    }
                    Err(TrySendError::Disconnected(_)) => closed.push(subscriber.id),
                }
            }
        }

        if !closed.is_empty() {
            self.subscribers.write().retain(|s| !closed.contains(&s.id));
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn clear(&self) {
        self.subscribers.write().clear();
    }
}
