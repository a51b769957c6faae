//! Admin API endpoints.
//!
//! All endpoints require the admin token. The purge trigger exists so an
//! operator can force an immediate purge (say, to clear a disk-space
//! emergency) outside the scheduled cadence.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use serde::Deserialize;
use tracing::info;

use super::auth::{AdminAuth, HasTokens};
use super::error::ApiError;
use crate::purge::{PurgeEngine, PurgeError};

/// State for admin endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub engine: PurgeEngine,
    pub default_retention: chrono::Duration,
    pub api_token: String,
    pub admin_token: String,
}

impl HasTokens for AdminState {
    fn api_token(&self) -> &str {
        &self.api_token
    }
    fn admin_token(&self) -> &str {
        &self.admin_token
    }
}

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/purge", post(trigger_purge))
        .with_state(state)
}

/// Optional retention override. `retention_seconds` takes precedence over
/// the whole-days convenience field; with neither, the configured default
/// applies.
#[derive(Debug, Default, Deserialize)]
struct PurgeRequest {
    retention_seconds: Option<i64>,
    retention_days: Option<i64>,
}

/// Run a purge pass now and return its result.
async fn trigger_purge(
    State(state): State<AdminState>,
    _auth: AdminAuth,
    body: Option<Json<PurgeRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let retention = if let Some(seconds) = request.retention_seconds {
        chrono::Duration::try_seconds(seconds)
            .ok_or_else(|| ApiError::bad_request("retention_seconds out of range"))?
    } else if let Some(days) = request.retention_days {
        chrono::Duration::try_days(days)
            .ok_or_else(|| ApiError::bad_request("retention_days out of range"))?
    } else {
        state.default_retention
    };

    info!(
        retention_seconds = retention.num_seconds(),
        "Admin-triggered purge"
    );

    let result = state.engine.purge(retention).await.map_err(|e| match e {
        PurgeError::InvalidRetention(_) => ApiError::bad_request(e.to_string()),
        PurgeError::Db(e) => ApiError::db_error("Purge failed", e),
    })?;

    Ok(Json(result))
}
