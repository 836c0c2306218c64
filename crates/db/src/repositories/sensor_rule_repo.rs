//! Repository for the `sensor_rules` table.

use fleetwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::sensor_rule::{SensorRule, UpsertSensorRule};

/// Column list for `sensor_rules` queries.
const COLUMNS: &str = "\
    id, device_sensor_id, name, conditions, logic, severity, message_template, \
    evaluation_window_minutes, consecutive_violations_required, cooldown_minutes, \
    is_enabled, created_at, updated_at";

/// Provides query operations for sensor rules.
pub struct SensorRuleRepo;

impl SensorRuleRepo {
    /// Find a rule by id.
    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<SensorRule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sensor_rules WHERE id = $1");
        sqlx::query_as::<_, SensorRule>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the enabled rules for a sensor, oldest first.
    ///
    /// This is the evaluation pipeline's per-reading rule set.
    pub async fn list_active_for_sensor(
        pool: &PgPool,
        device_sensor_id: DbId,
    ) -> Result<Vec<SensorRule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sensor_rules \
             WHERE device_sensor_id = $1 AND is_enabled = true \
             ORDER BY id"
        );
        sqlx::query_as::<_, SensorRule>(&query)
            .bind(device_sensor_id)
            .fetch_all(pool)
            .await
    }

    /// List every rule for a sensor, enabled or not.
    pub async fn list_for_sensor(
        pool: &PgPool,
        device_sensor_id: DbId,
    ) -> Result<Vec<SensorRule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sensor_rules WHERE device_sensor_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, SensorRule>(&query)
            .bind(device_sensor_id)
            .fetch_all(pool)
            .await
    }

    /// Insert a new rule.
    pub async fn create(
        pool: &PgPool,
        rule: &UpsertSensorRule<'_>,
    ) -> Result<SensorRule, sqlx::Error> {
        let query = format!(
            "INSERT INTO sensor_rules \
                (device_sensor_id, name, conditions, logic, severity, message_template, \
                 evaluation_window_minutes, consecutive_violations_required, cooldown_minutes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SensorRule>(&query)
            .bind(rule.device_sensor_id)
            .bind(rule.name)
            .bind(rule.conditions)
            .bind(rule.logic)
            .bind(rule.severity)
            .bind(rule.message_template)
            .bind(rule.evaluation_window_minutes)
            .bind(rule.consecutive_violations_required)
            .bind(rule.cooldown_minutes)
            .fetch_one(pool)
            .await
    }

    /// Update an existing rule in place, returning the new row.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        rule: &UpsertSensorRule<'_>,
    ) -> Result<Option<SensorRule>, sqlx::Error> {
        let query = format!(
            "UPDATE sensor_rules SET \
                name = $2, conditions = $3, logic = $4, severity = $5, \
                message_template = $6, evaluation_window_minutes = $7, \
                consecutive_violations_required = $8, cooldown_minutes = $9, \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SensorRule>(&query)
            .bind(id)
            .bind(rule.name)
            .bind(rule.conditions)
            .bind(rule.logic)
            .bind(rule.severity)
            .bind(rule.message_template)
            .bind(rule.evaluation_window_minutes)
            .bind(rule.consecutive_violations_required)
            .bind(rule.cooldown_minutes)
            .fetch_optional(pool)
            .await
    }

    /// Soft-enable or soft-disable a rule.
    ///
    /// Rules referenced by alert history are never hard-deleted.
    pub async fn set_enabled(
        pool: &PgPool,
        id: DbId,
        is_enabled: bool,
    ) -> Result<Option<SensorRule>, sqlx::Error> {
        let query = format!(
            "UPDATE sensor_rules SET is_enabled = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SensorRule>(&query)
            .bind(id)
            .bind(is_enabled)
            .fetch_optional(pool)
            .await
    }
}
