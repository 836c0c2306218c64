//! Repository for the `device_sensors` table.

use fleetwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::sensor::DeviceSensor;

/// Column list for `device_sensors` queries.
const COLUMNS: &str = "id, device_id, sensor_type, name, unit, created_at";

/// Provides query operations for device sensors.
pub struct SensorRepo;

impl SensorRepo {
    /// Find a sensor by id.
    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<DeviceSensor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM device_sensors WHERE id = $1");
        sqlx::query_as::<_, DeviceSensor>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the sensors attached to a device.
    pub async fn list_for_device(
        pool: &PgPool,
        device_id: DbId,
    ) -> Result<Vec<DeviceSensor>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM device_sensors WHERE device_id = $1 ORDER BY name");
        sqlx::query_as::<_, DeviceSensor>(&query)
            .bind(device_id)
            .fetch_all(pool)
            .await
    }

    /// Insert a sensor channel for a device.
    pub async fn create(
        pool: &PgPool,
        device_id: DbId,
        sensor_type: &str,
        name: &str,
        unit: Option<&str>,
    ) -> Result<DeviceSensor, sqlx::Error> {
        let query = format!(
            "INSERT INTO device_sensors (device_id, sensor_type, name, unit) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeviceSensor>(&query)
            .bind(device_id)
            .bind(sensor_type)
            .bind(name)
            .bind(unit)
            .fetch_one(pool)
            .await
    }
}
