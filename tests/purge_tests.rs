//! End-to-end tests for the retention-based purge: expired entities and their
//! photo files are removed, everything else is left alone.

mod common;

use common::{backdate_deletion, setup};
use fieldmark::db::PhotoOwner;
use fieldmark::purge::PurgeEngine;
use fieldmark::storage::StorageProvider;

fn retention() -> chrono::Duration {
    chrono::Duration::days(10)
}

#[tokio::test]
async fn test_expired_marker_purged_with_photo_files() {
    let ctx = setup().await;
    let engine = PurgeEngine::new(ctx.db.clone(), ctx.storage.clone());

    let marker_uuid = ctx.db.markers().create("Pole 9", 52.5, 13.4).await.unwrap();
    let marker = ctx
        .db
        .markers()
        .get_by_uuid(&marker_uuid)
        .await
        .unwrap()
        .unwrap();

    // Two uploaded photos attached to the marker
    let mut file_names = Vec::new();
    for bytes in [b"front".as_slice(), b"back".as_slice()] {
        let name = ctx
            .storage
            .upload(bytes, "site.jpg", "image/jpeg")
            .await
            .unwrap();
        ctx.db
            .photos()
            .create(&name, "image/jpeg", PhotoOwner::Marker(marker.id))
            .await
            .unwrap();
        file_names.push(name);
    }

    ctx.db.markers().mark_deleted(&marker_uuid).await.unwrap();
    backdate_deletion(&ctx.db, "markers", &marker_uuid, 11).await;

    let result = engine.purge(retention()).await.unwrap();

    assert_eq!(result.markers_purged, 1);
    assert_eq!(result.photo_files_attempted, 2);
    assert_eq!(result.photo_files_deleted, 2);

    // Row, photo rows, and files are all gone
    assert!(
        ctx.db
            .markers()
            .get_by_uuid(&marker_uuid)
            .await
            .unwrap()
            .is_none()
    );
    assert!(ctx.db.photos().for_marker(marker.id).await.unwrap().is_empty());
    for name in &file_names {
        assert!(!ctx.storage.exists(name).await.unwrap());
    }
}

#[tokio::test]
async fn test_recent_and_live_entities_untouched() {
    let ctx = setup().await;
    let engine = PurgeEngine::new(ctx.db.clone(), ctx.storage.clone());

    let live = ctx.db.markers().create("live", 0.0, 0.0).await.unwrap();
    let route = ctx
        .db
        .routes()
        .create("Trench A", r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#)
        .await
        .unwrap();

    // Deleted 5 days ago, still inside the 10-day window
    ctx.db.routes().mark_deleted(&route).await.unwrap();
    backdate_deletion(&ctx.db, "routes", &route, 5).await;

    let result = engine.purge(retention()).await.unwrap();

    assert_eq!(result.rows_purged(), 0);
    assert_eq!(result.photo_files_attempted, 0);
    assert!(ctx.db.markers().get_by_uuid(&live).await.unwrap().is_some());

    let route = ctx.db.routes().get_by_uuid(&route).await.unwrap().unwrap();
    assert!(route.deleted);
    assert!(route.deleted_at.is_some());
}

#[tokio::test]
async fn test_missing_photo_file_does_not_block_row_purge() {
    let ctx = setup().await;
    let engine = PurgeEngine::new(ctx.db.clone(), ctx.storage.clone());

    let waypoint_uuid = ctx
        .db
        .waypoints()
        .create("WP 3", 1.0, 1.0, None, None)
        .await
        .unwrap();
    let waypoint = ctx
        .db
        .waypoints()
        .get_by_uuid(&waypoint_uuid)
        .await
        .unwrap()
        .unwrap();

    // Photo row references a file that was never written
    ctx.db
        .photos()
        .create("ghost.jpg", "image/jpeg", PhotoOwner::Waypoint(waypoint.id))
        .await
        .unwrap();

    ctx.db.waypoints().mark_deleted(&waypoint_uuid).await.unwrap();
    backdate_deletion(&ctx.db, "waypoints", &waypoint_uuid, 11).await;

    let result = engine.purge(retention()).await.unwrap();

    assert_eq!(result.waypoints_purged, 1);
    assert_eq!(result.photo_files_attempted, 1);
    assert_eq!(result.photo_files_deleted, 0);
    assert!(
        ctx.db
            .waypoints()
            .get_by_uuid(&waypoint_uuid)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_storage_failure_does_not_block_row_purge() {
    let ctx = setup().await;
    let engine = PurgeEngine::new(ctx.db.clone(), ctx.storage.clone());

    let marker_uuid = ctx.db.markers().create("Pole 4", 0.0, 0.0).await.unwrap();
    let marker = ctx
        .db
        .markers()
        .get_by_uuid(&marker_uuid)
        .await
        .unwrap()
        .unwrap();

    let name = ctx
        .storage
        .upload(b"bytes", "site.jpg", "image/jpeg")
        .await
        .unwrap();
    ctx.db
        .photos()
        .create(&name, "image/jpeg", PhotoOwner::Marker(marker.id))
        .await
        .unwrap();

    // Replace the file with a directory so the delete fails with a real
    // I/O error rather than not-found
    let path = ctx.storage_root.join("photos").join(&name);
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    ctx.db.markers().mark_deleted(&marker_uuid).await.unwrap();
    backdate_deletion(&ctx.db, "markers", &marker_uuid, 11).await;

    let result = engine.purge(retention()).await.unwrap();

    assert_eq!(result.markers_purged, 1);
    assert_eq!(result.photo_files_attempted, 1);
    assert_eq!(result.photo_files_deleted, 0);
    assert!(
        ctx.db
            .markers()
            .get_by_uuid(&marker_uuid)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_all_entity_kinds_purged_in_one_pass() {
    let ctx = setup().await;
    let engine = PurgeEngine::new(ctx.db.clone(), ctx.storage.clone());

    let marker = ctx.db.markers().create("m", 0.0, 0.0).await.unwrap();
    let route = ctx
        .db
        .routes()
        .create("r", r#"{"type":"LineString","coordinates":[]}"#)
        .await
        .unwrap();
    let waypoint = ctx
        .db
        .waypoints()
        .create("w", 0.0, 0.0, Some(&route), Some(0))
        .await
        .unwrap();

    ctx.db.markers().mark_deleted(&marker).await.unwrap();
    ctx.db.routes().mark_deleted(&route).await.unwrap();
    ctx.db.waypoints().mark_deleted(&waypoint).await.unwrap();
    backdate_deletion(&ctx.db, "markers", &marker, 12).await;
    backdate_deletion(&ctx.db, "routes", &route, 12).await;
    backdate_deletion(&ctx.db, "waypoints", &waypoint, 12).await;

    let result = engine.purge(retention()).await.unwrap();

    assert_eq!(result.markers_purged, 1);
    assert_eq!(result.waypoints_purged, 1);
    assert_eq!(result.routes_purged, 1);
    assert_eq!(result.rows_purged(), 3);

    // A second pass finds nothing
    let second = engine.purge(retention()).await.unwrap();
    assert!(!second.has_deletions());
}

#[tokio::test]
async fn test_restored_entity_survives_purge() {
    let ctx = setup().await;
    let engine = PurgeEngine::new(ctx.db.clone(), ctx.storage.clone());

    let uuid = ctx.db.markers().create("m", 0.0, 0.0).await.unwrap();
    ctx.db.markers().mark_deleted(&uuid).await.unwrap();
    backdate_deletion(&ctx.db, "markers", &uuid, 30).await;
    ctx.db.markers().restore(&uuid).await.unwrap();

    let result = engine.purge(retention()).await.unwrap();

    assert_eq!(result.rows_purged(), 0);
    let marker = ctx.db.markers().get_by_uuid(&uuid).await.unwrap().unwrap();
    assert!(!marker.deleted);
}
