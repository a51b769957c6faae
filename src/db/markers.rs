//! Point asset store (poles, handholes, splice cases).
//!
//! Markers are soft-deletable: user deletion sets `deleted` + `deleted_at`,
//! and the purge engine removes expired rows permanently later.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct MarkerStore {
    pool: SqlitePool,
}

/// A point asset.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Marker {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub qa_status: String,
    pub deleted: bool,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

const MARKER_COLUMNS: &str =
    "id, uuid, name, lat, lon, qa_status, deleted, deleted_at, created_at, updated_at";

impl MarkerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new marker. Returns the marker UUID.
    pub async fn create(&self, name: &str, lat: f64, lon: f64) -> Result<String, sqlx::Error> {
        let uuid = uuid::Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO markers (uuid, name, lat, lon) VALUES (?, ?, ?, ?)")
            .bind(&uuid)
            .bind(name)
            .bind(lat)
            .bind(lon)
            .execute(&self.pool)
            .await?;

        Ok(uuid)
    }

    /// Get a marker by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Marker>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM markers WHERE uuid = ?",
            MARKER_COLUMNS
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
    }

    /// Update the QA review status.
    pub async fn set_qa_status(&self, uuid: &str, status: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE markers SET qa_status = ?, updated_at = datetime('now') WHERE uuid = ?",
        )
        .bind(status)
        .bind(uuid)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete a marker. Sets the deletion timestamp exactly once;
    /// returns false if the marker is missing or already deleted.
    pub async fn mark_deleted(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE markers SET deleted = 1, deleted_at = datetime('now')
             WHERE uuid = ? AND deleted = 0",
        )
        .bind(uuid)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Undo a soft delete. Clears the deletion timestamp;
    /// returns false if the marker is missing or not deleted.
    pub async fn restore(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE markers SET deleted = 0, deleted_at = NULL
             WHERE uuid = ? AND deleted = 1",
        )
        .bind(uuid)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Ids of markers soft-deleted before the cutoff (purge candidates).
    pub async fn find_expired(&self, cutoff: &str) -> Result<Vec<i64>, sqlx::Error> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT id FROM markers
             WHERE deleted = 1 AND deleted_at IS NOT NULL AND deleted_at < ?",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Permanently delete a purge candidate inside the purge transaction.
    /// Re-checks the soft-delete predicate so a concurrent restore wins the
    /// race. Returns the number of rows removed (0 or 1); photo rows cascade.
    pub async fn purge_id(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        id: i64,
        cutoff: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM markers
             WHERE id = ? AND deleted = 1 AND deleted_at IS NOT NULL AND deleted_at < ?",
        )
        .bind(id)
        .bind(cutoff)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
