//! Graph lifecycle events
//!
//! Emitted after a commit has been published (never for rolled-back work),
//! when schema indexes change, and once on shutdown. Subscribers receive them
//! over unbounded channels; a closed receiver is simply dropped.

use super::types::{Label, NodeId, RelationshipId, RelationshipType};
use parking_lot::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    NodeCreated {
        id: NodeId,
        labels: Vec<Label>,
        commit_ts: u64,
    },
    NodeDeleted {
        id: NodeId,
        labels: Vec<Label>,
        commit_ts: u64,
    },
    RelationshipCreated {
        id: RelationshipId,
        source: NodeId,
        target: NodeId,
        rel_type: RelationshipType,
        commit_ts: u64,
    },
    RelationshipDeleted {
        id: RelationshipId,
        commit_ts: u64,
    },
    IndexCreated {
        label: Label,
        property: String,
    },
    IndexDropped {
        label: Label,
        property: String,
    },
    Shutdown,
}

impl LifecycleEvent {
    /// Commit timestamp of a data event; `None` for schema and shutdown events
    pub fn commit_ts(&self) -> Option<u64> {
        match self {
            LifecycleEvent::NodeCreated { commit_ts, .. }
            | LifecycleEvent::NodeDeleted { commit_ts, .. }
            | LifecycleEvent::RelationshipCreated { commit_ts, .. }
            | LifecycleEvent::RelationshipDeleted { commit_ts, .. } => Some(*commit_ts),
            LifecycleEvent::IndexCreated { .. } | LifecycleEvent::IndexDropped { .. } | LifecycleEvent::Shutdown => {
                None
            }
        }
    }
}

/// Fan-out of lifecycle events to any number of subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<UnboundedSender<LifecycleEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> UnboundedReceiver<LifecycleEvent> {
        let (tx, rx) = unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver events in order, pruning subscribers that went away
    pub fn publish_all(&self, events: impl IntoIterator<Item = LifecycleEvent>) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        for event in events {
            subscribers.retain(|s| s.send(event.clone()).is_ok());
        }
        if subscribers.is_empty() {
            tracing::warn!("all lifecycle subscribers dropped");
        }
    }

    pub fn publish(&self, event: LifecycleEvent) {
        self.publish_all(std::iter::once(event));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_reach_every_subscriber() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(LifecycleEvent::Shutdown);

        assert_eq!(a.try_recv().unwrap(), LifecycleEvent::Shutdown);
        assert_eq!(b.try_recv().unwrap(), LifecycleEvent::Shutdown);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        let mut keep = bus.subscribe();
        drop(rx);

        bus.publish(LifecycleEvent::IndexCreated {
            label: Label::new("User"),
            property: "username".into(),
        });

        assert_eq!(bus.subscriber_count(), 1);
        assert!(keep.try_recv().is_ok());
    }
}
