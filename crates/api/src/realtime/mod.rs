//! Real-time event distribution.

pub mod router;

pub use router::EventRouter;

use fleetwatch_core::types::DbId;
use fleetwatch_db::models::alert::Alert;
use fleetwatch_db::repositories::DeviceRepo;
use fleetwatch_events::FleetEvent;

use crate::state::AppState;

/// Publish an alert lifecycle event with its full audience attached.
///
/// Shared by the WebSocket protocol and the REST alert handlers so both
/// paths broadcast identically. Location is best-effort audience
/// enrichment; a failed lookup only narrows delivery, it never blocks the
/// event.
pub async fn publish_alert_event(
    state: &AppState,
    event_type: &str,
    alert: &Alert,
    actor: Option<DbId>,
) {
    let mut event = FleetEvent::new(event_type)
        .with_device(alert.device_id)
        .with_payload(serde_json::json!({ "alert": alert }));

    match DeviceRepo::get(&state.pool, alert.device_id).await {
        Ok(Some(device)) => event = event.with_location(device.location_id),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(
                device_id = alert.device_id,
                error = %e,
                "Device lookup for event audience failed"
            );
        }
    }

    if let Some(actor) = actor {
        event = event.with_actor(actor);
    }

    state.event_bus.publish(event);
}
