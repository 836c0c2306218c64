//! Sensor rule entity models.

use fleetwatch_core::debounce::DebounceConfig;
use fleetwatch_core::error::CoreError;
use fleetwatch_core::rule::RuleConfig;
use fleetwatch_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `sensor_rules` table.
///
/// `conditions` holds the raw JSON clause array exactly as authored;
/// [`SensorRule::config`] revalidates it into a typed [`RuleConfig`] so a
/// row corrupted out-of-band surfaces as a validation error at load time,
/// never as an evaluation-time panic.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SensorRule {
    pub id: DbId,
    pub device_sensor_id: DbId,
    pub name: String,
    pub conditions: serde_json::Value,
    pub logic: String,
    pub severity: String,
    pub message_template: String,
    pub evaluation_window_minutes: i32,
    pub consecutive_violations_required: i32,
    pub cooldown_minutes: i32,
    pub is_enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SensorRule {
    /// Parse the stored configuration into its validated domain form.
    pub fn config(&self) -> Result<RuleConfig, CoreError> {
        RuleConfig::from_parts(
            &self.conditions,
            &self.logic,
            &self.severity,
            &self.message_template,
        )
    }

    /// Debounce parameters for the state tracker.
    pub fn debounce_config(&self) -> DebounceConfig {
        DebounceConfig {
            consecutive_required: self.consecutive_violations_required.max(1) as u32,
            cooldown: chrono::Duration::minutes(i64::from(self.cooldown_minutes)),
        }
    }

    /// How far back history may reach for change/pattern conditions.
    pub fn evaluation_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.evaluation_window_minutes))
    }
}

/// Insert/update payload for a sensor rule.
#[derive(Debug)]
pub struct UpsertSensorRule<'a> {
    pub device_sensor_id: DbId,
    pub name: &'a str,
    pub conditions: &'a serde_json::Value,
    pub logic: &'a str,
    pub severity: &'a str,
    pub message_template: &'a str,
    pub evaluation_window_minutes: i32,
    pub consecutive_violations_required: i32,
    pub cooldown_minutes: i32,
}
