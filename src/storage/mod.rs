//! Pluggable photo storage backends.
//!
//! Photo bytes are addressed by an opaque generated name and can live either
//! on the local filesystem or in an S3-compatible object store. The backend
//! is chosen once at startup from configuration and fixed for the process
//! lifetime; everything else talks to the [`StorageProvider`] trait.

mod local;
mod remote;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

pub use local::LocalStorage;
pub use remote::RemoteStorage;

/// Errors from storage operations. Not-found is never an error: absent blobs
/// surface as `None`/`false` from the individual operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("remote storage error: {0}")]
    Remote(String),

    #[error("storage configuration error: {0}")]
    Config(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Capability set shared by all storage backends.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Store bytes under a freshly generated collision-resistant name.
    /// The caller's original name is only consulted for the file extension;
    /// the returned name round-trips through the other operations.
    async fn upload(
        &self,
        bytes: &[u8],
        original_name: &str,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Fetch bytes by name. `None` when the name does not exist; errors
    /// signal transport/IO failure only.
    async fn download(&self, name: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Remove bytes by name. Idempotent: `false` (not an error) when the
    /// name did not exist, `true` only once the bytes are confirmed gone.
    async fn delete(&self, name: &str) -> StorageResult<bool>;

    /// Whether bytes exist under the given name.
    async fn exists(&self, name: &str) -> StorageResult<bool>;

    /// A reference usable to fetch the blob later: a relative path for the
    /// local backend, an absolute URI for the remote one.
    fn url_for(&self, name: &str) -> String;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}

/// Which backend to use, resolved once at startup.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StorageKind {
    #[default]
    Local,
    Remote,
}

/// Storage configuration assembled by the CLI layer.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Base directory for the local backend.
    pub root: PathBuf,
    /// Logical bucket/folder name. Subdirectory under `root` for local,
    /// bucket name for remote.
    pub container: String,
    /// Remote endpoint URL; required when `kind` is `Remote`.
    pub connection_string: Option<String>,
}

/// Build the configured storage backend.
///
/// Fails fast on invalid configuration (remote selected without a connection
/// string) so a misconfigured process never comes up half-working.
pub async fn build_storage(config: &StorageConfig) -> StorageResult<Arc<dyn StorageProvider>> {
    match config.kind {
        StorageKind::Local => {
            let storage = LocalStorage::new(config.root.clone(), &config.container);
            info!(root = %storage.container_dir().display(), "Using local photo storage");
            Ok(Arc::new(storage))
        }
        StorageKind::Remote => {
            let connection_string = config.connection_string.as_deref().ok_or_else(|| {
                StorageError::Config(
                    "remote storage requires a connection string (--storage-connection-string)"
                        .to_string(),
                )
            })?;
            let storage = RemoteStorage::new(connection_string, &config.container).await?;
            info!(bucket = %config.container, "Using remote photo storage");
            Ok(Arc::new(storage))
        }
    }
}

/// Generate a fresh storage name, keeping at most a short alphanumeric
/// extension from the caller-supplied name. The caller's name is otherwise
/// untrusted and discarded.
pub(crate) fn unique_name(original_name: &str) -> String {
    let id = uuid::Uuid::new_v4();
    match original_name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 8
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!("{}.{}", id, ext.to_ascii_lowercase())
        }
        _ => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_name_keeps_extension() {
        let name = unique_name("IMG_2043.JPG");
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), 36 + 4);
    }

    #[test]
    fn test_unique_name_rejects_suspicious_extensions() {
        assert_eq!(unique_name("noext").len(), 36);
        assert_eq!(unique_name(".hidden").len(), 36);
        assert_eq!(unique_name("x.").len(), 36);
        assert_eq!(unique_name("x.not-an-ext!").len(), 36);
        assert_eq!(unique_name("x.waytoolongext").len(), 36);
    }

    #[test]
    fn test_unique_names_do_not_collide() {
        assert_ne!(unique_name("a.jpg"), unique_name("a.jpg"));
    }

    #[tokio::test]
    async fn test_remote_without_connection_string_fails() {
        let config = StorageConfig {
            kind: StorageKind::Remote,
            root: PathBuf::from("/tmp"),
            container: "photos".to_string(),
            connection_string: None,
        };
        let result = build_storage(&config).await;
        assert!(matches!(result, Err(StorageError::Config(_))));
    }
}
