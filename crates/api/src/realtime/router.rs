//! Event-to-session routing.
//!
//! [`EventRouter`] subscribes to the event bus and fans each
//! [`FleetEvent`] out to the sessions watching its audience: the concerned
//! device's topic, the device's location topic, and -- for alert lifecycle
//! events -- the global alert feed. A session subscribed to several of
//! those receives exactly one frame.

use std::sync::Arc;

use axum::extract::ws::Message;
use fleetwatch_core::topic::Topic;
use fleetwatch_events::FleetEvent;
use tokio::sync::broadcast;

use crate::ws::ConnectionRegistry;

/// Routes fleet events to subscribed WebSocket sessions.
pub struct EventRouter {
    registry: Arc<ConnectionRegistry>,
}

impl EventRouter {
    /// Create a new router delivering through the given registry.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Run the main routing loop.
    ///
    /// Consumes events from the bus via `receiver` and delivers each one.
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](fleetwatch_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<FleetEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    self.route_event(&event).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event router shutting down");
                    break;
                }
            }
        }
    }

    /// Deliver a single event to every session in its audience.
    async fn route_event(&self, event: &FleetEvent) {
        let topics = audience_topics(event);
        if topics.is_empty() {
            tracing::debug!(event_type = %event.event_type, "Event has no audience, dropping");
            return;
        }

        let frame = serde_json::json!({
            "type": event.event_type,
            "device_id": event.device_id,
            "location_id": event.location_id,
            "payload": event.payload,
            "timestamp": event.timestamp,
        });
        let message = Message::Text(frame.to_string().into());

        let delivered = self.registry.publish_to_any(&topics, message).await;
        tracing::debug!(
            event_type = %event.event_type,
            topics = topics.len(),
            delivered,
            "Event routed"
        );
    }
}

/// Resolve an event's natural audience to concrete topics.
fn audience_topics(event: &FleetEvent) -> Vec<Topic> {
    let mut topics = Vec::with_capacity(3);
    if let Some(device_id) = event.device_id {
        topics.push(Topic::Device(device_id));
    }
    if let Some(location_id) = event.location_id {
        topics.push(Topic::Location(location_id));
    }
    // Alert lifecycle events also feed the fleet-wide alert stream.
    if event.event_type.starts_with("alert.") {
        topics.push(Topic::GlobalAlerts);
    }
    topics
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwatch_core::alert_events::{EVENT_ALERT_TRIGGERED, EVENT_DEVICE_STATUS};

    #[test]
    fn alert_events_reach_the_global_feed() {
        let event = FleetEvent::new(EVENT_ALERT_TRIGGERED)
            .with_device(4)
            .with_location(2);
        let topics = audience_topics(&event);
        assert_eq!(
            topics,
            vec![Topic::Device(4), Topic::Location(2), Topic::GlobalAlerts]
        );
    }

    #[test]
    fn device_status_stays_off_the_global_feed() {
        let event = FleetEvent::new(EVENT_DEVICE_STATUS).with_device(4);
        let topics = audience_topics(&event);
        assert_eq!(topics, vec![Topic::Device(4)]);
    }

    #[test]
    fn audience_free_event_resolves_to_no_topics() {
        let event = FleetEvent::new(EVENT_DEVICE_STATUS);
        assert!(audience_topics(&event).is_empty());
    }
}
