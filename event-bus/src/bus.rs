//! Broadcast bus: publish side and subscriber handle

use crate::{
    envelope::EventEnvelope,
    metrics::{EVENTS_PUBLISHED_TOTAL, SUBSCRIBER_LAG_TOTAL},
    Error, Result,
};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

/// Default channel capacity before slow subscribers start lagging
pub const DEFAULT_CAPACITY: usize = 1024;

/// Event bus
///
/// Cloning is cheap; all clones publish into the same stream.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create new bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event
    ///
    /// Returns the number of subscribers that received it. Publishing with no
    /// subscribers is not an error; the event is simply dropped.
    pub fn publish(&self, envelope: EventEnvelope) -> usize {
        let subject = envelope.subject();
        EVENTS_PUBLISHED_TOTAL.with_label_values(&[subject]).inc();

        debug!("Publishing event {} to subject: {}", envelope.id, subject);

        self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to the stream from this point on
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe as a `Stream` of envelopes
    pub fn stream(&self) -> BroadcastStream<EventEnvelope> {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Subscriber handle
#[derive(Debug)]
pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventEnvelope>,
}

impl EventSubscriber {
    /// Receive the next event
    ///
    /// Returns [`Error::Lagged`] when this subscriber fell more than the
    /// channel capacity behind; subsequent calls resume from the oldest
    /// retained event.
    pub async fn next(&mut self) -> Result<EventEnvelope> {
        match self.receiver.recv().await {
            Ok(envelope) => Ok(envelope),
            Err(err) => {
                if let tokio::sync::broadcast::error::RecvError::Lagged(skipped) = err {
                    SUBSCRIBER_LAG_TOTAL
                        .with_label_values(&["lagged"])
                        .inc_by(skipped);
                }
                Err(Error::from(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventKind;
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe();

        let env = EventEnvelope::new(EventKind::PlanCreated, json!({"plan_id": "basic"}), Utc::now());
        let delivered = bus.publish(env.clone());
        assert_eq!(delivered, 1);

        let received = sub.next().await.unwrap();
        assert_eq!(received.id, env.id);
        assert_eq!(received.kind, EventKind::PlanCreated);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        let env = EventEnvelope::new(EventKind::AssetAdded, json!({"asset": "USDC"}), Utc::now());
        assert_eq!(bus.publish(env), 0);
    }

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let env = EventEnvelope::new(EventKind::PaymentFailed, json!({"reason": "NotDue"}), Utc::now());
        assert_eq!(bus.publish(env.clone()), 2);

        assert_eq!(a.next().await.unwrap().id, env.id);
        assert_eq!(b.next().await.unwrap().id, env.id);
    }

    #[tokio::test]
    async fn test_stream_interface() {
        use tokio_stream::StreamExt;

        let bus = EventBus::default();
        let mut stream = bus.stream();

        let env = EventEnvelope::new(EventKind::Refunded, json!({"amount": "400"}), Utc::now());
        bus.publish(env.clone());

        let received = stream.next().await.unwrap().unwrap();
        assert_eq!(received.id, env.id);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_observes_gap() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.publish(EventEnvelope::new(
                EventKind::PaymentExecuted,
                json!({"seq": i}),
                Utc::now(),
            ));
        }

        // Capacity 2: the first recv reports the 3 skipped events.
        match sub.next().await {
            Err(Error::Lagged(skipped)) => assert_eq!(skipped, 3),
            other => panic!("expected lag error, got {:?}", other),
        }

        // Then the retained tail is still delivered in order.
        let e = sub.next().await.unwrap();
        assert_eq!(e.payload["seq"], 3);
    }
}
