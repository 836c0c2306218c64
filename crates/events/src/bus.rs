//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`FleetEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use fleetwatch_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// FleetEvent
// ---------------------------------------------------------------------------

/// A domain event with its natural audience.
///
/// Constructed via [`FleetEvent::new`] and enriched with the builder
/// methods [`with_device`](FleetEvent::with_device),
/// [`with_location`](FleetEvent::with_location),
/// [`with_actor`](FleetEvent::with_actor), and
/// [`with_payload`](FleetEvent::with_payload). The router derives the
/// target topics from whichever audience fields are set; an event with no
/// audience fields reaches only the global alert feed (when it is an
/// alert event).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetEvent {
    /// Dot-separated event name, e.g. `"alert.triggered"`.
    pub event_type: String,

    /// Device this event concerns, if any.
    pub device_id: Option<DbId>,

    /// Location of the concerned device, if known.
    pub location_id: Option<DbId>,

    /// The user whose action produced the event, if any.
    pub actor_user_id: Option<DbId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl FleetEvent {
    /// Create a new event with only the required `event_type`.
    ///
    /// All optional fields default to `None` / empty object.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            device_id: None,
            location_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the concerned device.
    pub fn with_device(mut self, device_id: DbId) -> Self {
        self.device_id = Some(device_id);
        self
    }

    /// Attach the concerned device's location.
    pub fn with_location(mut self, location_id: DbId) -> Self {
        self.location_id = Some(location_id);
        self
    }

    /// Attach the acting user.
    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`FleetEvent`].
pub struct EventBus {
    sender: broadcast::Sender<FleetEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: FleetEvent) {
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = FleetEvent::new("alert.triggered")
            .with_device(42)
            .with_location(7)
            .with_payload(serde_json::json!({"severity": "critical"}));

        bus.publish(event);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "alert.triggered");
        assert_eq!(received.device_id, Some(42));
        assert_eq!(received.location_id, Some(7));
        assert_eq!(received.payload["severity"], "critical");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(FleetEvent::new("device.status"));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.event_type, "device.status");
        assert_eq!(e2.event_type, "device.status");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        // No subscribers -- this must not panic.
        bus.publish(FleetEvent::new("alert.resolved"));
    }

    #[test]
    fn default_event_has_empty_optional_fields() {
        let event = FleetEvent::new("device.command");
        assert_eq!(event.event_type, "device.command");
        assert!(event.device_id.is_none());
        assert!(event.location_id.is_none());
        assert!(event.actor_user_id.is_none());
        assert!(event.payload.is_object());
    }
}
