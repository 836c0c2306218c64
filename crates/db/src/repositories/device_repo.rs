//! Repository for the `devices` table.

use fleetwatch_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::device::{CreateDevice, Device};

/// Column list for `devices` queries.
const COLUMNS: &str = "\
    id, name, location_id, is_armed, is_online, last_seen_at, \
    api_key_hash, created_at, updated_at";

/// Provides query operations for devices.
pub struct DeviceRepo;

impl DeviceRepo {
    /// Find a device by id.
    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<Device>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM devices WHERE id = $1");
        sqlx::query_as::<_, Device>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Check whether a device exists.
    pub async fn exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM devices WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// List all devices ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<Device>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM devices ORDER BY name");
        sqlx::query_as::<_, Device>(&query).fetch_all(pool).await
    }

    /// Insert a new device.
    pub async fn create(pool: &PgPool, device: &CreateDevice<'_>) -> Result<Device, sqlx::Error> {
        let query = format!(
            "INSERT INTO devices (name, location_id, api_key_hash) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(device.name)
            .bind(device.location_id)
            .bind(device.api_key_hash)
            .fetch_one(pool)
            .await
    }

    /// Authenticate a device by its ingest key hash.
    pub async fn find_by_api_key_hash(
        pool: &PgPool,
        api_key_hash: &str,
    ) -> Result<Option<Device>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM devices WHERE api_key_hash = $1");
        sqlx::query_as::<_, Device>(&query)
            .bind(api_key_hash)
            .fetch_optional(pool)
            .await
    }

    /// Set the armed flag, returning the updated row.
    pub async fn set_armed(
        pool: &PgPool,
        id: DbId,
        is_armed: bool,
    ) -> Result<Option<Device>, sqlx::Error> {
        let query = format!(
            "UPDATE devices SET is_armed = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(id)
            .bind(is_armed)
            .fetch_optional(pool)
            .await
    }

    /// Record a heartbeat: mark the device online and stamp `last_seen_at`.
    pub async fn touch_last_seen(
        pool: &PgPool,
        id: DbId,
        seen_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE devices SET is_online = true, last_seen_at = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(seen_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}
