//! In-process topic bus.
//!
//! Subscribers are kept in registration order, each with the set of topics
//! it listens to. Publishing walks the list once and hands the event to every
//! matching subscriber's unbounded channel, so each subscriber sees events in
//! the order they were published. Closed subscribers are pruned on publish.

use std::collections::HashSet;
use std::sync::Mutex;
use swarm_application::{MessageBus, Subscription};
use swarm_domain::{SwarmEvent, Topic};
use tokio::sync::mpsc;
use tracing::trace;

struct Listener {
    /// `None` listens to every topic
    topics: Option<HashSet<Topic>>,
    sender: mpsc::UnboundedSender<SwarmEvent>,
}

impl Listener {
    fn wants(&self, topic: Topic) -> bool {
        self.topics.as_ref().is_none_or(|t| t.contains(&topic))
    }
}

/// Registry of subscribers organized by topic.
#[derive(Default)]
pub struct InProcessEventBus {
    listeners: Mutex<Vec<Listener>>,
}

impl InProcessEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscribers for the given topic.
    pub fn listener_count(&self, topic: Topic) -> usize {
        self.listeners
            .lock()
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|l| !l.sender.is_closed() && l.wants(topic))
                    .count()
            })
            .unwrap_or(0)
    }
}

impl MessageBus for InProcessEventBus {
    fn publish(&self, event: SwarmEvent) {
        let Ok(mut listeners) = self.listeners.lock() else {
            return;
        };
        let topic = event.topic;
        let mut delivered = 0usize;
        listeners.retain(|listener| {
            if !listener.wants(topic) {
                return !listener.sender.is_closed();
            }
            let sent = listener.sender.send(event.clone()).is_ok();
            delivered += usize::from(sent);
            sent
        });
        trace!(topic = %topic, delivered, "Event published");
    }

    fn subscribe(&self, topics: &[Topic]) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let topics = (!topics.is_empty()).then(|| topics.iter().copied().collect());
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Listener { topics, sender });
        }
        Subscription::new(receiver)
    }
}
