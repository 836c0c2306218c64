//! Alert dispatch: persist, then distribute.
//!
//! A fired rule becomes an alert row with status `active`; on success the
//! created alert goes onto the event bus for the real-time layer. The
//! insert runs under a timeout so a stalled database never wedges the
//! evaluation pipeline -- a timed-out dispatch is reported as failed (the
//! alert is unconfirmed) and logged, never silently dropped.

use std::sync::Arc;
use std::time::Duration;

use fleetwatch_core::alert::Severity;
use fleetwatch_core::alert_events::EVENT_ALERT_TRIGGERED;
use fleetwatch_core::types::DbId;
use fleetwatch_db::models::alert::Alert;
use fleetwatch_db::models::device::Device;
use fleetwatch_db::repositories::AlertRepo;
use fleetwatch_db::DbPool;
use fleetwatch_events::{EventBus, FleetEvent};

/// How long a dispatch may wait on the alert insert.
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("alert insert failed: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("alert insert timed out after {}s", DISPATCH_TIMEOUT.as_secs())]
    Timeout,
}

/// Persists fired alerts and hands them to the distribution layer.
pub struct AlertDispatcher {
    pool: DbPool,
    bus: Arc<EventBus>,
}

impl AlertDispatcher {
    pub fn new(pool: DbPool, bus: Arc<EventBus>) -> Self {
        Self { pool, bus }
    }

    /// Persist a new `active` alert and publish `alert.triggered`.
    ///
    /// Errors go back to the caller; they must never crash evaluation of
    /// other sensors.
    pub async fn dispatch(
        &self,
        device: &Device,
        sensor_rule_id: DbId,
        severity: Severity,
        message: &str,
    ) -> Result<Alert, DispatchError> {
        let insert = AlertRepo::insert(
            &self.pool,
            device.id,
            sensor_rule_id,
            severity.as_str(),
            message,
        );

        let alert = match tokio::time::timeout(DISPATCH_TIMEOUT, insert).await {
            Ok(Ok(alert)) => alert,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(DispatchError::Timeout),
        };

        let event = FleetEvent::new(EVENT_ALERT_TRIGGERED)
            .with_device(device.id)
            .with_location(device.location_id)
            .with_payload(serde_json::json!({ "alert": alert }));
        self.bus.publish(event);

        Ok(alert)
    }
}
