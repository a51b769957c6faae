pub mod api;
pub mod cli;
pub mod db;
pub mod purge;
pub mod scheduler;
pub mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use db::Database;
use purge::PurgeEngine;
use scheduler::SchedulerConfig;
use storage::StorageProvider;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use api::create_api_router;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Photo storage backend, fixed for the process lifetime
    pub storage: Arc<dyn StorageProvider>,
    /// Retention window applied when an admin purge request carries no override
    pub default_retention: chrono::Duration,
    /// Bearer token for field clients
    pub api_token: String,
    /// Bearer token for operational endpoints
    pub admin_token: String,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    Router::new().nest(
        "/api",
        create_api_router(
            config.db.clone(),
            config.storage.clone(),
            config.default_retention,
            config.api_token.clone(),
            config.admin_token.clone(),
        ),
    )
}

/// Spawn the background purge scheduler.
/// Call this before starting the server; cancel the token to stop it.
pub fn init_purge_scheduler(
    config: &ServerConfig,
    scheduler: SchedulerConfig,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let engine = PurgeEngine::new(config.db.clone(), config.storage.clone());
    scheduler::spawn_purge_scheduler(engine, scheduler, shutdown)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
