//! Device sensor entity models.

use fleetwatch_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `device_sensors` table.
///
/// One physical or logical sensor channel on a device (e.g. the
/// temperature half of a DHT22).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeviceSensor {
    pub id: DbId,
    pub device_id: DbId,
    pub sensor_type: String,
    pub name: String,
    pub unit: Option<String>,
    pub created_at: Timestamp,
}

/// A row from the `sensor_readings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SensorReading {
    pub id: DbId,
    pub device_sensor_id: DbId,
    pub value: f64,
    pub recorded_at: Timestamp,
}
