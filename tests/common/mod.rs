#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, header},
};
use fieldmark::db::Database;
use fieldmark::storage::{LocalStorage, StorageProvider};
use fieldmark::{ServerConfig, create_app};
use tempfile::TempDir;

pub const API_TOKEN: &str = "test-api-token";
pub const ADMIN_TOKEN: &str = "test-admin-token";

pub struct TestContext {
    pub app: Router,
    pub db: Database,
    pub storage: Arc<dyn StorageProvider>,
    /// Root of the local storage backend (photos live under `photos/`).
    pub storage_root: std::path::PathBuf,
    // Held for its Drop: removes the storage directory when the test ends
    _storage_dir: TempDir,
}

/// Create a test app backed by an in-memory database and a temp-dir local
/// storage backend, with a 10-day default retention.
pub async fn setup() -> TestContext {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let storage_dir = TempDir::new().expect("Failed to create temp dir");
    let storage: Arc<dyn StorageProvider> =
        Arc::new(LocalStorage::new(storage_dir.path().to_path_buf(), "photos"));

    let config = ServerConfig {
        db: db.clone(),
        storage: storage.clone(),
        default_retention: chrono::Duration::days(10),
        api_token: API_TOKEN.to_string(),
        admin_token: ADMIN_TOKEN.to_string(),
    };

    TestContext {
        app: create_app(&config),
        db,
        storage,
        storage_root: storage_dir.path().to_path_buf(),
        _storage_dir: storage_dir,
    }
}

/// Backdate a soft-deletion timestamp so it falls outside the retention
/// window. `table` is one of the entity tables.
pub async fn backdate_deletion(db: &Database, table: &str, uuid: &str, days: i64) {
    sqlx::query(&format!(
        "UPDATE {} SET deleted_at = datetime('now', '-{} days') WHERE uuid = ?",
        table, days
    ))
    .bind(uuid)
    .execute(db.pool())
    .await
    .expect("Failed to backdate deletion");
}

/// Build a `POST /api/admin/purge` request with an optional JSON body.
pub fn purge_request(token: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri("/api/admin/purge")
        .header(header::AUTHORIZATION, format!("Bearer {}", token));

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

const BOUNDARY: &str = "----FieldmarkTestBoundary";

/// Build a multipart/form-data photo upload body.
pub fn multipart_body(file: Option<&[u8]>, fields: &[(&str, &str)]) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    if let Some(bytes) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"site.jpg\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// Build a photo upload request.
pub fn upload_request(token: &str, file: Option<&[u8]>, fields: &[(&str, &str)]) -> Request<Body> {
    let (content_type, body) = multipart_body(file, fields);
    Request::builder()
        .method("POST")
        .uri("/api/photos")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

/// Build an authenticated GET request.
pub fn get_request(token: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Read a response body as JSON.
pub async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body is not valid JSON")
}

/// Read a response body as raw bytes.
pub async fn response_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body")
        .to_vec()
}
