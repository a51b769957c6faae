//! Photo API: upload, download, and storage references.
//!
//! Uploads are multipart; the photo is attached to exactly one marker or
//! exactly one waypoint. Bytes go to the storage provider, only metadata is
//! recorded in the database.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;

use super::auth::{ApiAuth, HasTokens};
use super::error::{ApiError, ResultExt};
use crate::db::{Database, PhotoOwner};
use crate::storage::StorageProvider;

/// 10MB limit for a single site photo.
const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// State for photo endpoints.
#[derive(Clone)]
pub struct PhotosState {
    pub db: Database,
    pub storage: Arc<dyn StorageProvider>,
    pub api_token: String,
    pub admin_token: String,
}

impl HasTokens for PhotosState {
    fn api_token(&self) -> &str {
        &self.api_token
    }
    fn admin_token(&self) -> &str {
        &self.admin_token
    }
}

pub fn router(state: PhotosState) -> Router {
    Router::new()
        .route("/", post(upload_photo))
        .route("/{uuid}", get(get_photo))
        .route("/{uuid}/url", get(get_photo_url))
        .layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES + 64 * 1024))
        .with_state(state)
}

// --- Response types ---

#[derive(Serialize)]
struct UploadResponse {
    uuid: String,
    file_name: String,
}

#[derive(Serialize)]
struct UrlResponse {
    url: String,
}

// --- Handlers ---

/// Upload a photo using multipart form data.
///
/// Expected fields:
/// - `file`: binary photo data (filename and content type taken from the part)
/// - `marker_uuid` or `waypoint_uuid`: the owning entity (exactly one)
async fn upload_photo(
    State(state): State<PhotosState>,
    _auth: ApiAuth,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file: Option<(Vec<u8>, String, String)> = None;
    let mut marker_uuid: Option<String> = None;
    let mut waypoint_uuid: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Invalid multipart data"))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let original_name = field.file_name().unwrap_or("photo").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read file data"))?;
                file = Some((data.to_vec(), original_name, content_type));
            }
            "marker_uuid" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read marker_uuid"))?;
                marker_uuid = Some(text);
            }
            "waypoint_uuid" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read waypoint_uuid"))?;
                waypoint_uuid = Some(text);
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let (bytes, original_name, content_type) =
        file.ok_or_else(|| ApiError::bad_request("Missing file field"))?;

    if bytes.len() > MAX_PHOTO_BYTES {
        return Err(ApiError::bad_request("Photo too large (max 10MB)"));
    }

    // Exactly one owner
    let owner = match (marker_uuid, waypoint_uuid) {
        (Some(marker), None) => {
            let marker = state
                .db
                .markers()
                .get_by_uuid(&marker)
                .await
                .db_err("Failed to look up marker")?
                .ok_or_else(|| ApiError::not_found("Marker not found"))?;
            PhotoOwner::Marker(marker.id)
        }
        (None, Some(waypoint)) => {
            let waypoint = state
                .db
                .waypoints()
                .get_by_uuid(&waypoint)
                .await
                .db_err("Failed to look up waypoint")?
                .ok_or_else(|| ApiError::not_found("Waypoint not found"))?;
            PhotoOwner::Waypoint(waypoint.id)
        }
        _ => {
            return Err(ApiError::bad_request(
                "Provide exactly one of marker_uuid or waypoint_uuid",
            ));
        }
    };

    let file_name = state
        .storage
        .upload(&bytes, &original_name, &content_type)
        .await
        .storage_err("Failed to store photo")?;

    let uuid = state
        .db
        .photos()
        .create(&file_name, &content_type, owner)
        .await
        .db_err("Failed to record photo")?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse { uuid, file_name }),
    ))
}

/// Stream a photo back as binary.
async fn get_photo(
    State(state): State<PhotosState>,
    _auth: ApiAuth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let photo = state
        .db
        .photos()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to get photo")?
        .ok_or_else(|| ApiError::not_found("Photo not found"))?;

    let bytes = state
        .storage
        .download(&photo.file_name)
        .await
        .storage_err("Failed to fetch photo")?
        .ok_or_else(|| ApiError::not_found("Photo file not found"))?;

    let mut headers = HeaderMap::new();
    if let Ok(content_type) = photo.content_type.parse() {
        headers.insert(header::CONTENT_TYPE, content_type);
    }

    Ok((headers, Body::from(bytes)))
}

/// Return a reference for fetching the photo directly from storage.
async fn get_photo_url(
    State(state): State<PhotosState>,
    _auth: ApiAuth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let photo = state
        .db
        .photos()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to get photo")?
        .ok_or_else(|| ApiError::not_found("Photo not found"))?;

    Ok(Json(UrlResponse {
        url: state.storage.url_for(&photo.file_name),
    }))
}
