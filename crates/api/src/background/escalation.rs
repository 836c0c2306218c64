//! Periodic re-notification of neglected alerts.
//!
//! The scanner walks all `active` alerts on a fixed interval and
//! re-publishes `alert.escalated` for any whose age exceeds its severity's
//! threshold -- status is never touched, only the notification side effect
//! fires. Runs are single-flight: if a sweep is still in progress when the
//! next tick (or an operator-triggered call) arrives, the new invocation
//! is a no-op, so one alert is never double-notified in the same tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleetwatch_core::alert_events::EVENT_ALERT_ESCALATED;
use fleetwatch_core::types::{DbId, Timestamp};
use fleetwatch_db::repositories::{AlertRepo, DeviceRepo};
use fleetwatch_db::DbPool;
use fleetwatch_events::{EventBus, FleetEvent};
use tokio_util::sync::CancellationToken;

/// How often the scanner sweeps active alerts.
const SCAN_INTERVAL: Duration = Duration::from_secs(60);

/// Sweep bookkeeping, owned by whichever invocation holds the lock.
#[derive(Default)]
struct ScanState {
    /// Last re-notification per alert id. An alert past its threshold is
    /// re-notified at most once per threshold interval, not every tick.
    last_notified: HashMap<DbId, Timestamp>,
}

/// Escalation scanner; share via `Arc` between the interval loop and any
/// operational trigger.
pub struct EscalationScanner {
    pool: DbPool,
    bus: Arc<EventBus>,
    state: tokio::sync::Mutex<ScanState>,
}

impl EscalationScanner {
    pub fn new(pool: DbPool, bus: Arc<EventBus>) -> Self {
        Self {
            pool,
            bus,
            state: tokio::sync::Mutex::new(ScanState::default()),
        }
    }

    /// Run the scan loop until the cancellation token is triggered.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(SCAN_INTERVAL);
        tracing::info!(
            interval_secs = SCAN_INTERVAL.as_secs(),
            "Escalation scanner started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Escalation scanner stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.process_escalations().await {
                        Ok(processed) if processed > 0 => {
                            tracing::info!(processed, "Escalation sweep re-notified alerts");
                        }
                        Ok(_) => {
                            tracing::debug!("Escalation sweep found nothing to re-notify");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Escalation sweep failed");
                        }
                    }
                }
            }
        }
    }

    /// One sweep over all active alerts; returns how many were re-notified.
    ///
    /// Safe to invoke concurrently with itself: a second caller finds the
    /// state lock held and returns `Ok(0)` immediately.
    pub async fn process_escalations(&self) -> Result<usize, sqlx::Error> {
        let Ok(mut state) = self.state.try_lock() else {
            tracing::debug!("Escalation sweep already in flight, skipping");
            return Ok(0);
        };

        let now = Utc::now();
        let alerts = AlertRepo::list_active(&self.pool).await?;

        let mut processed = 0;
        for alert in &alerts {
            let severity = match alert.severity() {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(alert_id = alert.id, error = %e, "Skipping alert with invalid severity");
                    continue;
                }
            };

            let threshold = severity.escalation_threshold();
            let age = now - alert.triggered_at;
            if age <= threshold {
                continue;
            }

            let due = state
                .last_notified
                .get(&alert.id)
                .is_none_or(|last| now - *last > threshold);
            if !due {
                continue;
            }
            state.last_notified.insert(alert.id, now);

            let mut event = FleetEvent::new(EVENT_ALERT_ESCALATED)
                .with_device(alert.device_id)
                .with_payload(serde_json::json!({
                    "alert": alert,
                    "age_minutes": age.num_minutes(),
                }));
            match DeviceRepo::get(&self.pool, alert.device_id).await {
                Ok(Some(device)) => event = event.with_location(device.location_id),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(device_id = alert.device_id, error = %e, "Device lookup during escalation failed");
                }
            }
            self.bus.publish(event);
            processed += 1;
        }

        // Alerts that left the active state no longer need bookkeeping.
        let active_ids: std::collections::HashSet<DbId> =
            alerts.iter().map(|a| a.id).collect();
        state.last_notified.retain(|id, _| active_ids.contains(id));

        Ok(processed)
    }
}
