//! Typed message bus for editor side channels.
//!
//! Components publish a closed set of message types (one enum per producer)
//! through an [`EventBus`]. Each message is wrapped in an [`EventEnvelope`]
//! carrying an ID and timestamp; consumers subscribe independently and match
//! on the payload enum, so payload shapes are checked at compile time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// A message type that can travel on an [`EventBus`].
pub trait BusEvent: Clone + Send + std::fmt::Debug + 'static {
    /// Namespaced event type (e.g. `"editor.content_changed"`).
    fn event_type(&self) -> &'static str;
}

/// Envelope around a published message.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope<E> {
    /// UUIDv7 so envelopes sort by emission time.
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub payload: E,
}

impl<E: BusEvent> EventEnvelope<E> {
    pub fn new(event: E) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.event_type(),
            occurred_at: Utc::now(),
            payload: event,
        }
    }
}

/// Broadcast-based bus. Slow receivers that fall behind get `Lagged` and
/// miss messages; messages emitted with no subscribers are dropped.
#[derive(Debug)]
pub struct EventBus<E> {
    tx: broadcast::Sender<EventEnvelope<E>>,
}

impl<E: BusEvent> EventBus<E> {
    /// Create a new bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn emit(&self, event: E) {
        let envelope = EventEnvelope::new(event);
        let subscriber_count = self.tx.receiver_count();
        tracing::trace!(
            event_type = envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count,
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to messages emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope<E>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(tag = "type")]
    enum Ping {
        Hello { n: u32 },
        Bye,
    }

    impl BusEvent for Ping {
        fn event_type(&self) -> &'static str {
            match self {
                Ping::Hello { .. } => "ping.hello",
                Ping::Bye => "ping.bye",
            }
        }
    }

    #[tokio::test]
    async fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.emit(Ping::Hello { n: 3 });

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.payload, Ping::Hello { n: 3 });
        assert_eq!(envelope.event_type, "ping.hello");
        assert_eq!(envelope.event_id.get_version_num(), 7);
    }

    #[tokio::test]
    async fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new(8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        bus.emit(Ping::Bye);

        assert_eq!(rx1.recv().await.unwrap().payload, Ping::Bye);
        assert_eq!(rx2.recv().await.unwrap().payload, Ping::Bye);
    }

    #[test]
    fn test_event_bus_no_subscribers_ok() {
        let bus: EventBus<Ping> = EventBus::default();
        bus.emit(Ping::Bye);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_bus_subscriber_count() {
        let bus: EventBus<Ping> = EventBus::new(4);
        let rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
        drop(rx1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_envelope_json() {
        let json = serde_json::to_value(EventEnvelope::new(Ping::Hello { n: 1 })).unwrap();
        assert_eq!(json["event_type"], "ping.hello");
        assert_eq!(json["payload"]["type"], "Hello");
        assert_eq!(json["payload"]["n"], 1);
    }
}
