//! Repository for the `sensor_readings` table.

use fleetwatch_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::sensor::SensorReading;

/// Column list for `sensor_readings` queries.
const COLUMNS: &str = "id, device_sensor_id, value, recorded_at";

/// Provides query operations for sensor readings.
pub struct ReadingRepo;

impl ReadingRepo {
    /// Insert a reading.
    pub async fn insert(
        pool: &PgPool,
        device_sensor_id: DbId,
        value: f64,
        recorded_at: Timestamp,
    ) -> Result<SensorReading, sqlx::Error> {
        let query = format!(
            "INSERT INTO sensor_readings (device_sensor_id, value, recorded_at) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SensorReading>(&query)
            .bind(device_sensor_id)
            .bind(value)
            .bind(recorded_at)
            .fetch_one(pool)
            .await
    }

    /// Recent readings for a sensor since `since`, oldest first, capped at
    /// `limit`.
    ///
    /// Used to rebuild the in-memory history window after a restart.
    pub async fn recent_for_sensor(
        pool: &PgPool,
        device_sensor_id: DbId,
        since: Timestamp,
        limit: i64,
    ) -> Result<Vec<SensorReading>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ( \
                SELECT {COLUMNS} FROM sensor_readings \
                WHERE device_sensor_id = $1 AND recorded_at >= $2 \
                ORDER BY recorded_at DESC LIMIT $3 \
             ) recent ORDER BY recorded_at"
        );
        sqlx::query_as::<_, SensorReading>(&query)
            .bind(device_sensor_id)
            .bind(since)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
