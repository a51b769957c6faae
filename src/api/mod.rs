mod admin;
mod auth;
mod error;
mod photos;

use std::sync::Arc;

use axum::Router;

use crate::db::Database;
use crate::purge::PurgeEngine;
use crate::storage::StorageProvider;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    storage: Arc<dyn StorageProvider>,
    default_retention: chrono::Duration,
    api_token: String,
    admin_token: String,
) -> Router {
    let photos_state = photos::PhotosState {
        db: db.clone(),
        storage: storage.clone(),
        api_token: api_token.clone(),
        admin_token: admin_token.clone(),
    };

    let admin_state = admin::AdminState {
        engine: PurgeEngine::new(db, storage),
        default_retention,
        api_token,
        admin_token,
    };

    Router::new()
        .nest("/photos", photos::router(photos_state))
        .nest("/admin", admin::router(admin_state))
}
