//! Device entity models.

use fleetwatch_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `devices` table.
///
/// `api_key_hash` is the SHA-256 hex digest of the device's ingest key;
/// the plaintext key exists only in the registration response.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Device {
    pub id: DbId,
    pub name: String,
    pub location_id: DbId,
    pub is_armed: bool,
    pub is_online: bool,
    pub last_seen_at: Option<Timestamp>,
    #[serde(skip_serializing)]
    pub api_key_hash: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert payload for a new device.
#[derive(Debug)]
pub struct CreateDevice<'a> {
    pub name: &'a str,
    pub location_id: DbId,
    pub api_key_hash: &'a str,
}
