//! Alert entity model.

use fleetwatch_core::alert::{AlertStatus, Severity};
use fleetwatch_core::error::CoreError;
use fleetwatch_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `alerts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Alert {
    pub id: DbId,
    pub device_id: DbId,
    pub sensor_rule_id: DbId,
    pub severity: String,
    pub message: String,
    pub status: String,
    pub triggered_at: Timestamp,
    pub acknowledged_at: Option<Timestamp>,
    pub acknowledged_by: Option<DbId>,
    pub resolved_at: Option<Timestamp>,
    pub resolved_by: Option<DbId>,
}

impl Alert {
    pub fn severity(&self) -> Result<Severity, CoreError> {
        Severity::from_str(&self.severity)
    }

    pub fn status(&self) -> Result<AlertStatus, CoreError> {
        AlertStatus::from_str(&self.status)
    }
}
