//! CLI argument parsing, validation, and startup helpers.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use crate::db::Database;
use crate::scheduler::SchedulerConfig;
use crate::storage::{StorageConfig, StorageKind};

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Fieldmark",
    about = "Field survey assets with soft delete and retention-based purge"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7320")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "fieldmark.db")]
    pub database: String,

    /// Bearer token for field clients
    #[arg(long, env = "FIELDMARK_API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// Bearer token for admin endpoints
    #[arg(long, env = "FIELDMARK_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: String,

    /// Photo storage backend
    #[arg(long, value_enum, default_value = "local")]
    pub storage_provider: StorageKind,

    /// Base directory for local photo storage
    #[arg(long, default_value = "storage")]
    pub storage_root: PathBuf,

    /// Bucket (remote) or subdirectory (local) for photos
    #[arg(long, default_value = "photos")]
    pub storage_container: String,

    /// Endpoint URL for the remote storage backend
    #[arg(long, env = "FIELDMARK_STORAGE_CONNECTION_STRING", hide_env_values = true)]
    pub storage_connection_string: Option<String>,

    /// Days a soft-deleted entity stays recoverable before purge
    #[arg(long, default_value_t = crate::scheduler::DEFAULT_RETENTION_DAYS)]
    pub purge_after_days: i64,

    /// Seconds to wait after startup before the first purge pass
    #[arg(long, default_value = "60")]
    pub purge_initial_delay_secs: u64,

    /// Seconds between purge passes
    #[arg(long, default_value = "86400")]
    pub purge_interval_secs: u64,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

impl Args {
    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            kind: self.storage_provider,
            root: self.storage_root.clone(),
            container: self.storage_container.clone(),
            connection_string: self.storage_connection_string.clone(),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            initial_delay: Duration::from_secs(self.purge_initial_delay_secs),
            interval: Duration::from_secs(self.purge_interval_secs),
            retention: chrono::Duration::days(self.purge_after_days),
        }
    }
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Validate the retention window. A non-positive window would purge entities
/// the moment they are soft-deleted, so refuse to start.
pub fn validate_retention(days: i64) -> bool {
    if days <= 0 {
        error!(days, "purge-after-days must be positive");
        return false;
    }
    true
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
