//! Rule evaluation pipeline.
//!
//! [`RuleEngine::on_reading`] is the entry point invoked once per ingested
//! sample. For each enabled rule on the sensor it evaluates the conditions,
//! feeds the verdict through that rule's debounce state machine, and hands
//! fired alerts to the [`AlertDispatcher`].
//!
//! Concurrency model: runtime state (hit counters, cooldowns, the history
//! window) lives in per-(sensor, rule) slots, each behind its own
//! `tokio::sync::Mutex`. Verdicts for one key are therefore applied in
//! arrival order, while different keys evaluate fully in parallel -- there
//! is no global evaluation lock.

pub mod dispatcher;

use std::collections::HashMap;
use std::sync::Arc;

use fleetwatch_core::debounce::{DebounceDecision, RuleRuntimeState};
use fleetwatch_core::history::{ValueHistory, HISTORY_CAPACITY};
use fleetwatch_core::rule::{evaluate_rule, render_message, MessageContext};
use fleetwatch_core::types::{DbId, Timestamp};
use fleetwatch_db::models::device::Device;
use fleetwatch_db::models::sensor::DeviceSensor;
use fleetwatch_db::models::sensor_rule::SensorRule;
use fleetwatch_db::repositories::{ReadingRepo, SensorRuleRepo};
use fleetwatch_db::DbPool;
use fleetwatch_events::EventBus;
use tokio::sync::{Mutex, RwLock};

use dispatcher::{AlertDispatcher, DispatchError};

/// One evaluation key: (device_sensor_id, sensor_rule_id).
pub type RuleKey = (DbId, DbId);

/// Summary of one reading's trip through the pipeline.
#[derive(Debug, Default)]
pub struct ReadingOutcome {
    /// Rules evaluated for this reading.
    pub rules_evaluated: usize,
    /// Alerts fired and persisted.
    pub alerts_fired: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to load rules: {0}")]
    RuleLoad(#[from] sqlx::Error),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Mutable per-key runtime state.
///
/// History is kept per rule key rather than per sensor because each rule
/// bounds its history by its own evaluation window.
#[derive(Default)]
struct RuleSlot {
    runtime: RuleRuntimeState,
    history: ValueHistory,
    /// Whether history was seeded by replaying persisted readings. Debounce
    /// counters are not replayed; a restart resets them, which is accepted.
    seeded: bool,
}

/// The evaluation pipeline shared by ingest handlers.
pub struct RuleEngine {
    pool: DbPool,
    dispatcher: AlertDispatcher,
    slots: RwLock<HashMap<RuleKey, Arc<Mutex<RuleSlot>>>>,
}

impl RuleEngine {
    pub fn new(pool: DbPool, bus: Arc<EventBus>) -> Self {
        let dispatcher = AlertDispatcher::new(pool.clone(), bus);
        Self {
            pool,
            dispatcher,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Evaluate one reading against every enabled rule on its sensor.
    ///
    /// One rule's failure (bad stored config, dispatch error) never aborts
    /// its siblings: every rule is attempted, and the first dispatch error
    /// is returned afterwards so the caller can surface it. Rule-load
    /// failures abort immediately -- with no rule set there is nothing to
    /// evaluate.
    pub async fn on_reading(
        &self,
        device: &Device,
        sensor: &DeviceSensor,
        value: f64,
        recorded_at: Timestamp,
    ) -> Result<ReadingOutcome, EngineError> {
        let rules = SensorRuleRepo::list_active_for_sensor(&self.pool, sensor.id).await?;

        let mut outcome = ReadingOutcome::default();
        let mut first_dispatch_error: Option<DispatchError> = None;

        for rule in rules {
            outcome.rules_evaluated += 1;

            let config = match rule.config() {
                Ok(config) => config,
                Err(e) => {
                    // Authoring-time validation should make this unreachable;
                    // a row corrupted out-of-band only disables itself.
                    tracing::warn!(rule_id = rule.id, error = %e, "Skipping rule with invalid stored config");
                    continue;
                }
            };

            let slot = self.slot((sensor.id, rule.id)).await;
            let fired = {
                let mut slot = slot.lock().await;

                if !slot.seeded {
                    // First evaluation since startup: rebuild the window
                    // from persisted readings. Best-effort -- an empty
                    // window only delays change/pattern conditions.
                    self.seed_history(&mut slot, sensor.id, recorded_at, &rule)
                        .await;
                    slot.seeded = true;
                }

                slot.history
                    .evict_older_than(recorded_at - rule.evaluation_window());

                let history = slot.history.values();
                let verdict = evaluate_rule(&config, value, &history);
                let decision =
                    slot.runtime
                        .observe(verdict.triggered, recorded_at, &rule.debounce_config());

                slot.history.push(recorded_at, value);
                matches!(decision, DebounceDecision::Fire)
            };

            if !fired {
                continue;
            }

            let message = render_message(
                &config.message_template,
                &MessageContext {
                    device_name: &device.name,
                    sensor_name: &sensor.name,
                    value,
                    severity: config.severity,
                },
            );

            match self
                .dispatcher
                .dispatch(device, rule.id, config.severity, &message)
                .await
            {
                Ok(alert) => {
                    outcome.alerts_fired += 1;
                    tracing::info!(
                        alert_id = alert.id,
                        rule_id = rule.id,
                        sensor_id = sensor.id,
                        severity = %alert.severity,
                        "Alert dispatched"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        rule_id = rule.id,
                        sensor_id = sensor.id,
                        error = %e,
                        "Alert dispatch failed"
                    );
                    first_dispatch_error.get_or_insert(e);
                }
            }
        }

        match first_dispatch_error {
            Some(e) => Err(e.into()),
            None => Ok(outcome),
        }
    }

    /// Replay persisted readings into a fresh slot's history window.
    ///
    /// The current reading is already persisted by ingest, so anything
    /// recorded at or after `current` is excluded.
    async fn seed_history(
        &self,
        slot: &mut RuleSlot,
        device_sensor_id: DbId,
        current: Timestamp,
        rule: &SensorRule,
    ) {
        let since = current - rule.evaluation_window();
        let readings = match ReadingRepo::recent_for_sensor(
            &self.pool,
            device_sensor_id,
            since,
            (HISTORY_CAPACITY + 1) as i64,
        )
        .await
        {
            Ok(readings) => readings,
            Err(e) => {
                tracing::warn!(
                    sensor_id = device_sensor_id,
                    error = %e,
                    "History replay failed, starting with an empty window"
                );
                return;
            }
        };

        for reading in readings {
            if reading.recorded_at < current {
                slot.history.push(reading.recorded_at, reading.value);
            }
        }
    }

    /// Get or create the state slot for a rule key.
    async fn slot(&self, key: RuleKey) -> Arc<Mutex<RuleSlot>> {
        if let Some(slot) = self.slots.read().await.get(&key) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(key).or_default())
    }

    /// Drop runtime state for rules that no longer exist or were disabled.
    ///
    /// Called opportunistically by rule mutation handlers; stale slots are
    /// harmless (they only hold a few floats) but pointless to keep.
    pub async fn forget_rule(&self, rule_id: DbId) {
        let mut slots = self.slots.write().await;
        slots.retain(|(_, slot_rule_id), _| *slot_rule_id != rule_id);
    }
}
