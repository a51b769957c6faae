//! Photo metadata records.
//!
//! The binary bytes live in the storage provider under `file_name`; rows here
//! only reference them. Each photo belongs to exactly one marker or exactly
//! one waypoint (exclusivity is guaranteed by the upload path).

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct PhotoStore {
    pool: SqlitePool,
}

/// The entity a photo is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoOwner {
    Marker(i64),
    Waypoint(i64),
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Photo {
    pub id: i64,
    pub uuid: String,
    pub file_name: String,
    pub content_type: String,
    pub marker_id: Option<i64>,
    pub waypoint_id: Option<i64>,
    pub uploaded_at: String,
}

const PHOTO_COLUMNS: &str =
    "id, uuid, file_name, content_type, marker_id, waypoint_id, uploaded_at";

impl PhotoStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a photo under its owning entity. Returns the photo UUID.
    pub async fn create(
        &self,
        file_name: &str,
        content_type: &str,
        owner: PhotoOwner,
    ) -> Result<String, sqlx::Error> {
        let uuid = uuid::Uuid::new_v4().to_string();
        let (marker_id, waypoint_id) = match owner {
            PhotoOwner::Marker(id) => (Some(id), None),
            PhotoOwner::Waypoint(id) => (None, Some(id)),
        };

        sqlx::query(
            "INSERT INTO photos (uuid, file_name, content_type, marker_id, waypoint_id)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&uuid)
        .bind(file_name)
        .bind(content_type)
        .bind(marker_id)
        .bind(waypoint_id)
        .execute(&self.pool)
        .await?;

        Ok(uuid)
    }

    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Photo>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM photos WHERE uuid = ?",
            PHOTO_COLUMNS
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
    }

    /// All photos attached to the given marker.
    pub async fn for_marker(&self, marker_id: i64) -> Result<Vec<Photo>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM photos WHERE marker_id = ?",
            PHOTO_COLUMNS
        ))
        .bind(marker_id)
        .fetch_all(&self.pool)
        .await
    }

    /// All photos attached to the given waypoint.
    pub async fn for_waypoint(&self, waypoint_id: i64) -> Result<Vec<Photo>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM photos WHERE waypoint_id = ?",
            PHOTO_COLUMNS
        ))
        .bind(waypoint_id)
        .fetch_all(&self.pool)
        .await
    }
}
