//! Message bus port
//!
//! Topic-based publish/subscribe. Delivery is FIFO per publisher; nothing is
//! promised across topics.

use swarm_domain::{SwarmEvent, Topic};
use tokio::sync::mpsc;

/// Receiving end of a bus subscription
///
/// Dropping the subscription unsubscribes; the bus prunes closed
/// subscribers on its next publish.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<SwarmEvent>,
}

impl Subscription {
    pub fn new(receiver: mpsc::UnboundedReceiver<SwarmEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<SwarmEvent> {
        self.receiver.recv().await
    }

    /// Non-blocking receive
    pub fn try_recv(&mut self) -> Option<SwarmEvent> {
        self.receiver.try_recv().ok()
    }

    /// Drain everything that is already queued
    pub fn drain(&mut self) -> Vec<SwarmEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

pub trait MessageBus: Send + Sync {
    /// Deliver an event to every live subscriber of its topic.
    fn publish(&self, event: SwarmEvent);

    /// Subscribe to a set of topics. An empty slice subscribes to all.
    fn subscribe(&self, topics: &[Topic]) -> Subscription;
}
