//! Repository for the `alerts` table.
//!
//! Status transitions are guarded with conditional updates (`WHERE status
//! = <expected>`), so a concurrent acknowledge/resolve race resolves in
//! the database: the loser sees zero updated rows and reports a conflict
//! instead of overwriting the winner.

use fleetwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::alert::Alert;

/// Column list for `alerts` queries.
const COLUMNS: &str = "\
    id, device_id, sensor_rule_id, severity, message, status, triggered_at, \
    acknowledged_at, acknowledged_by, resolved_at, resolved_by";

/// Provides query operations for alerts.
pub struct AlertRepo;

impl AlertRepo {
    /// Find an alert by id.
    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alerts WHERE id = $1");
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new alert with status `active`.
    pub async fn insert(
        pool: &PgPool,
        device_id: DbId,
        sensor_rule_id: DbId,
        severity: &str,
        message: &str,
    ) -> Result<Alert, sqlx::Error> {
        let query = format!(
            "INSERT INTO alerts (device_id, sensor_rule_id, severity, message, status) \
             VALUES ($1, $2, $3, $4, 'active') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(device_id)
            .bind(sensor_rule_id)
            .bind(severity)
            .bind(message)
            .fetch_one(pool)
            .await
    }

    /// Acknowledge an active alert.
    ///
    /// Returns `None` when the alert is missing or no longer `active`
    /// (the caller reports this as a conflict, not an error).
    pub async fn acknowledge(
        pool: &PgPool,
        id: DbId,
        actor_id: DbId,
    ) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts SET \
                status = 'acknowledged', acknowledged_at = NOW(), acknowledged_by = $2 \
             WHERE id = $1 AND status = 'active' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .bind(actor_id)
            .fetch_optional(pool)
            .await
    }

    /// Resolve an active or acknowledged alert.
    ///
    /// Returns `None` when the alert is missing or already resolved; the
    /// existing `resolved_at` / `resolved_by` are never overwritten.
    pub async fn resolve(
        pool: &PgPool,
        id: DbId,
        actor_id: DbId,
    ) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts SET \
                status = 'resolved', resolved_at = NOW(), resolved_by = $2 \
             WHERE id = $1 AND status IN ('active', 'acknowledged') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .bind(actor_id)
            .fetch_optional(pool)
            .await
    }

    /// List all alerts still in the `active` state, oldest first.
    ///
    /// Oldest-first so the escalation scanner re-notifies the longest
    /// neglected alerts before fresher ones.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Alert>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts WHERE status = 'active' ORDER BY triggered_at"
        );
        sqlx::query_as::<_, Alert>(&query).fetch_all(pool).await
    }

    /// List recent alerts for a device, newest first.
    pub async fn list_for_device(
        pool: &PgPool,
        device_id: DbId,
        limit: i64,
    ) -> Result<Vec<Alert>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts \
             WHERE device_id = $1 \
             ORDER BY triggered_at DESC LIMIT $2"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(device_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// List recent alerts across the fleet, newest first.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Alert>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM alerts ORDER BY triggered_at DESC LIMIT $1");
        sqlx::query_as::<_, Alert>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
