//! Retention-based purge engine.
//!
//! Soft-deleted markers, waypoints and routes older than the retention
//! window are permanently removed, together with their photo files. Photo
//! files are deleted first, best-effort, so a crash can only ever leave an
//! orphaned row (retried on the next run) and never an orphaned file that
//! nothing references anymore. Row deletion for all three kinds then happens
//! in a single transaction, and every row delete re-checks the soft-delete
//! predicate so a concurrent restore wins the race.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::{Database, MarkerStore, Photo, RouteStore, WaypointStore, sqlite_datetime};
use crate::storage::StorageProvider;

#[derive(Debug, Error)]
pub enum PurgeError {
    /// Zero or negative retention would purge non-expired (or non-deleted)
    /// data and is rejected outright, never clamped.
    #[error("retention must be positive, got {0} seconds")]
    InvalidRetention(i64),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Outcome of a single purge run. Produced fresh per run, never persisted.
#[derive(Debug, Serialize)]
pub struct PurgeResult {
    /// Retention window that was applied, in seconds.
    pub retention_seconds: i64,
    /// Entities soft-deleted before this instant were eligible.
    pub cutoff: DateTime<Utc>,
    pub markers_purged: u64,
    pub waypoints_purged: u64,
    pub routes_purged: u64,
    pub photo_files_attempted: u64,
    pub photo_files_deleted: u64,
}

impl Default for PurgeResult {
    fn default() -> Self {
        Self {
            retention_seconds: 0,
            cutoff: DateTime::UNIX_EPOCH,
            markers_purged: 0,
            waypoints_purged: 0,
            routes_purged: 0,
            photo_files_attempted: 0,
            photo_files_deleted: 0,
        }
    }
}

impl PurgeResult {
    /// Total rows purged across all entity kinds.
    pub fn rows_purged(&self) -> u64 {
        self.markers_purged + self.waypoints_purged + self.routes_purged
    }

    pub fn has_deletions(&self) -> bool {
        self.rows_purged() > 0 || self.photo_files_attempted > 0
    }
}

#[derive(Clone)]
pub struct PurgeEngine {
    db: Database,
    storage: Arc<dyn StorageProvider>,
}

impl PurgeEngine {
    pub fn new(db: Database, storage: Arc<dyn StorageProvider>) -> Self {
        Self { db, storage }
    }

    /// Run one purge pass with the given retention window.
    ///
    /// Safe to call repeatedly: a second immediate run selects nothing and
    /// returns all-zero counts.
    pub async fn purge(&self, retention: Duration) -> Result<PurgeResult, PurgeError> {
        if retention <= Duration::zero() {
            return Err(PurgeError::InvalidRetention(retention.num_seconds()));
        }

        let cutoff = Utc::now() - retention;
        let cutoff_str = sqlite_datetime(cutoff);

        let marker_ids = self.db.markers().find_expired(&cutoff_str).await?;
        let waypoint_ids = self.db.waypoints().find_expired(&cutoff_str).await?;
        let route_ids = self.db.routes().find_expired(&cutoff_str).await?;

        // Eagerly fetch the photos of every selected entity, then delete
        // their files before any row is touched.
        let mut photos: Vec<Photo> = Vec::new();
        for &id in &marker_ids {
            photos.extend(self.db.photos().for_marker(id).await?);
        }
        for &id in &waypoint_ids {
            photos.extend(self.db.photos().for_waypoint(id).await?);
        }

        let mut result = PurgeResult {
            retention_seconds: retention.num_seconds(),
            cutoff,
            ..Default::default()
        };

        for photo in &photos {
            result.photo_files_attempted += 1;
            match self.storage.delete(&photo.file_name).await {
                Ok(true) => result.photo_files_deleted += 1,
                Ok(false) => {
                    debug!(
                        photo = %photo.uuid,
                        file = %photo.file_name,
                        "Photo file already gone"
                    );
                }
                Err(e) => {
                    // Best-effort: the row purge proceeds regardless, the
                    // operator reconciles from this log line.
                    warn!(
                        photo = %photo.uuid,
                        file = %photo.file_name,
                        marker_id = ?photo.marker_id,
                        waypoint_id = ?photo.waypoint_id,
                        error = %e,
                        "Failed to delete photo file during purge"
                    );
                }
            }
        }

        // All three kinds in one commit; photo rows cascade with their owner.
        let mut tx = self.db.begin().await?;
        for id in marker_ids {
            result.markers_purged += MarkerStore::purge_id(&mut tx, id, &cutoff_str).await?;
        }
        for id in waypoint_ids {
            result.waypoints_purged += WaypointStore::purge_id(&mut tx, id, &cutoff_str).await?;
        }
        for id in route_ids {
            result.routes_purged += RouteStore::purge_id(&mut tx, id, &cutoff_str).await?;
        }
        tx.commit().await?;

        Ok(result)
    }
}
