//! Background purge scheduler.
//!
//! A single actor per process: waits out a startup grace period, then runs
//! one purge pass per interval until shutdown is signalled. A failed pass is
//! logged and the actor waits for the next tick; it never crashes the
//! process and never retries immediately.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::purge::PurgeEngine;

/// Startup grace period before the first pass, so purge I/O never competes
/// with process boot.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(60);

/// Time between passes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Days a soft-deleted entity stays recoverable.
pub const DEFAULT_RETENTION_DAYS: i64 = 10;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub initial_delay: Duration,
    pub interval: Duration,
    pub retention: chrono::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            interval: DEFAULT_INTERVAL,
            retention: chrono::Duration::days(DEFAULT_RETENTION_DAYS),
        }
    }
}

impl SchedulerConfig {
    /// Replace a zero interval with the default rather than spinning on a
    /// zero-length timer.
    fn normalized(self) -> Self {
        if self.interval.is_zero() {
            warn!(
                default_secs = DEFAULT_INTERVAL.as_secs(),
                "Purge interval of zero is invalid, falling back to default"
            );
            Self {
                interval: DEFAULT_INTERVAL,
                ..self
            }
        } else {
            self
        }
    }
}

/// Spawn the purge scheduler as a background task.
///
/// The returned handle completes once `shutdown` is cancelled. Cancellation
/// is cooperative: it is observed at the wait points, and an in-flight pass
/// is allowed to finish so file and row deletion are never split by a stop.
pub fn spawn_purge_scheduler(
    engine: PurgeEngine,
    config: SchedulerConfig,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_scheduler(engine, config, shutdown))
}

async fn run_scheduler(engine: PurgeEngine, config: SchedulerConfig, shutdown: CancellationToken) {
    let config = config.normalized();

    info!(
        initial_delay_secs = config.initial_delay.as_secs(),
        interval_secs = config.interval.as_secs(),
        retention_days = config.retention.num_days(),
        "Starting purge scheduler"
    );

    tokio::select! {
        _ = shutdown.cancelled() => {
            info!("Purge scheduler stopping before first pass");
            return;
        }
        _ = tokio::time::sleep(config.initial_delay) => {}
    }

    loop {
        run_pass(&engine, config.retention).await;

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Purge scheduler stopping");
                return;
            }
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}

/// Run a single pass. All errors end here: one failed pass must never
/// prevent subsequent passes.
async fn run_pass(engine: &PurgeEngine, retention: chrono::Duration) {
    match engine.purge(retention).await {
        Ok(result) if result.has_deletions() => {
            info!(
                markers = result.markers_purged,
                waypoints = result.waypoints_purged,
                routes = result.routes_purged,
                files_attempted = result.photo_files_attempted,
                files_deleted = result.photo_files_deleted,
                cutoff = %result.cutoff,
                "Purge pass complete"
            );
        }
        Ok(_) => {
            debug!("Purge pass complete, nothing to purge");
        }
        Err(e) => {
            error!(error = %e, "Purge pass failed, waiting for next interval");
        }
    }
}
