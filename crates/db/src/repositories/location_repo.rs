//! Repository for the `locations` table.

use fleetwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::location::Location;

/// Column list for `locations` queries.
const COLUMNS: &str = "id, name, created_at";

/// Provides query operations for locations.
pub struct LocationRepo;

impl LocationRepo {
    /// Find a location by id.
    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<Location>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM locations WHERE id = $1");
        sqlx::query_as::<_, Location>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Check whether a location exists.
    pub async fn exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM locations WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// List all locations ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<Location>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM locations ORDER BY name");
        sqlx::query_as::<_, Location>(&query).fetch_all(pool).await
    }

    /// Insert a new location.
    pub async fn create(pool: &PgPool, name: &str) -> Result<Location, sqlx::Error> {
        let query = format!("INSERT INTO locations (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Location>(&query)
            .bind(name)
            .fetch_one(pool)
            .await
    }
}
