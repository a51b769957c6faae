//! Line asset store (cable runs, trenches). Routes own no photos.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct RouteStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Route {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub path_geojson: String,
    pub qa_status: String,
    pub deleted: bool,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

const ROUTE_COLUMNS: &str =
    "id, uuid, name, path_geojson, qa_status, deleted, deleted_at, created_at, updated_at";

impl RouteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new route. Returns the route UUID.
    pub async fn create(&self, name: &str, path_geojson: &str) -> Result<String, sqlx::Error> {
        let uuid = uuid::Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO routes (uuid, name, path_geojson) VALUES (?, ?, ?)")
            .bind(&uuid)
            .bind(name)
            .bind(path_geojson)
            .execute(&self.pool)
            .await?;

        Ok(uuid)
    }

    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Route>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM routes WHERE uuid = ?",
            ROUTE_COLUMNS
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
    }

    /// Soft-delete a route. Returns false if missing or already deleted.
    pub async fn mark_deleted(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE routes SET deleted = 1, deleted_at = datetime('now')
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
            "UPDATE routes SET deleted = 0, deleted_at = NULL
             WHERE uuid = ? AND deleted = 1",
        )
        .bind(uuid)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Ids of routes soft-deleted before the cutoff (purge candidates).
    pub async fn find_expired(&self, cutoff: &str) -> Result<Vec<i64>, sqlx::Error> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT id FROM routes
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
            "DELETE FROM routes
             WHERE id = ? AND deleted = 1 AND deleted_at IS NOT NULL AND deleted_at < ?",
        )
        .bind(id)
        .bind(cutoff)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[tokio::test]
    async fn test_route_soft_delete() {
        let db = Database::open(":memory:").await.unwrap();
        let uuid = db
            .routes()
            .create("Run A", r#"{"type":"LineString","coordinates":[[13.4,52.5],[13.5,52.6]]}"#)
            .await
            .unwrap();

        assert!(db.routes().mark_deleted(&uuid).await.unwrap());
        let route = db.routes().get_by_uuid(&uuid).await.unwrap().unwrap();
        assert!(route.deleted);
        assert!(route.deleted_at.is_some());
    }
}
