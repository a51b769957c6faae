//! Waypoint store: intermediate points captured along a route.
//!
//! Same soft-delete lifecycle as markers; waypoints additionally carry an
//! optional parent route reference and an ordering position.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct WaypointStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Waypoint {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub route_uuid: Option<String>,
    pub position: Option<i64>,
    pub qa_status: String,
    pub deleted: bool,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

const WAYPOINT_COLUMNS: &str = "id, uuid, name, lat, lon, route_uuid, position, qa_status, \
     deleted, deleted_at, created_at, updated_at";

impl WaypointStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new waypoint. Returns the waypoint UUID.
    pub async fn create(
        &self,
        name: &str,
        lat: f64,
        lon: f64,
        route_uuid: Option<&str>,
        position: Option<i64>,
    ) -> Result<String, sqlx::Error> {
        let uuid = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO waypoints (uuid, name, lat, lon, route_uuid, position)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&uuid)
        .bind(name)
        .bind(lat)
        .bind(lon)
        .bind(route_uuid)
        .bind(position)
        .execute(&self.pool)
        .await?;

        Ok(uuid)
    }

    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Waypoint>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM waypoints WHERE uuid = ?",
            WAYPOINT_COLUMNS
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
    }

    /// Soft-delete a waypoint. Returns false if missing or already deleted.
    pub async fn mark_deleted(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE waypoints SET deleted = 1, deleted_at = datetime('now')
             WHERE uuid = ? AND deleted = 0",
        )
        .bind(uuid)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Undo a soft delete. Returns false if missing or not deleted.
    pub async fn restore(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE waypoints SET deleted = 0, deleted_at = NULL
             WHERE uuid = ? AND deleted = 1",
        )
        .bind(uuid)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Ids of waypoints soft-deleted before the cutoff (purge candidates).
    pub async fn find_expired(&self, cutoff: &str) -> Result<Vec<i64>, sqlx::Error> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT id FROM waypoints
             WHERE deleted = 1 AND deleted_at IS NOT NULL AND deleted_at < ?",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Permanently delete a purge candidate inside the purge transaction.
    /// Re-checks the soft-delete predicate so a concurrent restore wins.
    pub async fn purge_id(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        id: i64,
        cutoff: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM waypoints
             WHERE id = ? AND deleted = 1 AND deleted_at IS NOT NULL AND deleted_at < ?",
        )
        .bind(id)
        .bind(cutoff)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
