use clap::Parser;
use fieldmark::cli::{Args, init_logging, open_database, validate_retention};
use fieldmark::storage::build_storage;
use fieldmark::{ServerConfig, init_purge_scheduler, run_server};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    if !validate_retention(args.purge_after_days) {
        std::process::exit(1);
    }

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let storage = match build_storage(&args.storage_config()).await {
        Ok(storage) => storage,
        Err(e) => {
            error!(error = %e, "Failed to initialize photo storage");
            std::process::exit(1);
        }
    };

    let config = ServerConfig {
        db,
        storage,
        default_retention: chrono::Duration::days(args.purge_after_days),
        api_token: args.api_token.clone(),
        admin_token: args.admin_token.clone(),
    };

    let shutdown = CancellationToken::new();
    let scheduler_handle = init_purge_scheduler(&config, args.scheduler_config(), shutdown.clone());

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    info!(address = %listener.local_addr().unwrap(), "Listening");

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }

    shutdown.cancel();
    scheduler_handle.await.ok();
}
