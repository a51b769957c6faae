mod markers;
mod photos;
mod routes;
mod waypoints;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use markers::{Marker, MarkerStore};
pub use photos::{Photo, PhotoOwner, PhotoStore};
pub use routes::{Route, RouteStore};
pub use waypoints::{Waypoint, WaypointStore};

/// Format an instant the way SQLite's `datetime('now')` does, so that
/// comparisons against stored `deleted_at` values are exact.
pub fn sqlite_datetime(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        if version < 2 {
            self.migrate_v2().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                // Point assets (poles, handholes, splice cases, ...)
                "CREATE TABLE markers (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    name TEXT NOT NULL,
                    lat REAL NOT NULL,
                    lon REAL NOT NULL,
                    qa_status TEXT NOT NULL DEFAULT 'pending',
                    deleted INTEGER NOT NULL DEFAULT 0,
                    deleted_at TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_markers_uuid ON markers(uuid)",
                "CREATE INDEX idx_markers_deleted ON markers(deleted, deleted_at)",
                // Line assets (cable runs, trenches)
                "CREATE TABLE routes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    name TEXT NOT NULL,
                    path_geojson TEXT NOT NULL,
                    qa_status TEXT NOT NULL DEFAULT 'pending',
                    deleted INTEGER NOT NULL DEFAULT 0,
                    deleted_at TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_routes_uuid ON routes(uuid)",
                "CREATE INDEX idx_routes_deleted ON routes(deleted, deleted_at)",
                // Intermediate points along a route
                "CREATE TABLE waypoints (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    name TEXT NOT NULL,
                    lat REAL NOT NULL,
                    lon REAL NOT NULL,
                    route_uuid TEXT,
                    position INTEGER,
                    qa_status TEXT NOT NULL DEFAULT 'pending',
                    deleted INTEGER NOT NULL DEFAULT 0,
                    deleted_at TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_waypoints_uuid ON waypoints(uuid)",
                "CREATE INDEX idx_waypoints_route ON waypoints(route_uuid, position)",
                "CREATE INDEX idx_waypoints_deleted ON waypoints(deleted, deleted_at)",
            ],
        )
        .await
    }

    async fn migrate_v2(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            2,
            &[
                // Photo metadata. Bytes live in the storage provider under
                // file_name. Exactly one of marker_id/waypoint_id is set;
                // exclusivity is enforced by the upload path, not the schema.
                "CREATE TABLE photos (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    file_name TEXT NOT NULL,
                    content_type TEXT NOT NULL DEFAULT 'application/octet-stream',
                    marker_id INTEGER REFERENCES markers(id) ON DELETE CASCADE,
                    waypoint_id INTEGER REFERENCES waypoints(id) ON DELETE CASCADE,
                    uploaded_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_photos_uuid ON photos(uuid)",
                "CREATE INDEX idx_photos_marker ON photos(marker_id)",
                "CREATE INDEX idx_photos_waypoint ON photos(waypoint_id)",
            ],
        )
        .await
    }

    /// Get the marker store.
    pub fn markers(&self) -> MarkerStore {
        MarkerStore::new(self.pool.clone())
    }

    /// Get the waypoint store.
    pub fn waypoints(&self) -> WaypointStore {
        WaypointStore::new(self.pool.clone())
    }

    /// Get the route store.
    pub fn routes(&self) -> RouteStore {
        RouteStore::new(self.pool.clone())
    }

    /// Get the photo store.
    pub fn photos(&self) -> PhotoStore {
        PhotoStore::new(self.pool.clone())
    }

    /// Get the underlying connection pool (for tests that need raw SQL access).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a new transaction.
    pub async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_marker() {
        let db = Database::open(":memory:").await.unwrap();

        let uuid = db
            .markers()
            .create("Pole 17", 52.5200, 13.4050)
            .await
            .unwrap();

        let marker = db.markers().get_by_uuid(&uuid).await.unwrap().unwrap();
        assert_eq!(marker.uuid, uuid);
        assert_eq!(marker.name, "Pole 17");
        assert!(!marker.deleted);
        assert!(marker.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_soft_delete_sets_timestamp_once() {
        let db = Database::open(":memory:").await.unwrap();
        let uuid = db.markers().create("Pole 1", 0.0, 0.0).await.unwrap();

        assert!(db.markers().mark_deleted(&uuid).await.unwrap());
        let marker = db.markers().get_by_uuid(&uuid).await.unwrap().unwrap();
        assert!(marker.deleted);
        assert!(marker.deleted_at.is_some());

        // Second mark is a no-op, timestamp unchanged
        let first_deleted_at = marker.deleted_at.clone();
        assert!(!db.markers().mark_deleted(&uuid).await.unwrap());
        let marker = db.markers().get_by_uuid(&uuid).await.unwrap().unwrap();
        assert_eq!(marker.deleted_at, first_deleted_at);
    }

    #[tokio::test]
    async fn test_restore_clears_timestamp() {
        let db = Database::open(":memory:").await.unwrap();
        let uuid = db.markers().create("Pole 1", 0.0, 0.0).await.unwrap();

        db.markers().mark_deleted(&uuid).await.unwrap();
        assert!(db.markers().restore(&uuid).await.unwrap());

        let marker = db.markers().get_by_uuid(&uuid).await.unwrap().unwrap();
        assert!(!marker.deleted);
        assert!(marker.deleted_at.is_none());

        // Restoring a live marker does nothing
        assert!(!db.markers().restore(&uuid).await.unwrap());
    }

    #[test]
    fn test_sqlite_datetime_format() {
        let t = chrono::DateTime::parse_from_rfc3339("2026-03-01T08:15:30Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        assert_eq!(sqlite_datetime(t), "2026-03-01 08:15:30");
    }
}
