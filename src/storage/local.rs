//! Local filesystem storage backend.
//!
//! Photos are stored as `{root}/{container}/{name}`. The container directory
//! is provisioned lazily on first write so operators never have to pre-create
//! anything.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{StorageProvider, StorageResult, unique_name};

pub struct LocalStorage {
    root: PathBuf,
    container: String,
}

impl LocalStorage {
    pub fn new(root: PathBuf, container: &str) -> Self {
        Self {
            root,
            container: container.to_string(),
        }
    }

    pub fn container_dir(&self) -> PathBuf {
        self.root.join(&self.container)
    }

    fn file_path(&self, name: &str) -> PathBuf {
        // Names are generated by unique_name and contain no separators, but
        // reject anything path-like in case a stored name was tampered with.
        debug_assert!(!name.contains('/') && !name.contains('\\'));
        self.container_dir().join(Path::new(name).file_name().unwrap_or_default())
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn upload(
        &self,
        bytes: &[u8],
        original_name: &str,
        _content_type: &str,
    ) -> StorageResult<String> {
        let name = unique_name(original_name);
        let dir = self.container_dir();
        tokio::fs::create_dir_all(&dir).await?;

        // Write to a temp file first, then rename for atomicity. The suffix
        // is appended to the full name so distinct names never share a temp
        // path, and a failed rename leaves no stray temp file behind.
        let path = dir.join(&name);
        let temp_path = dir.join(format!("{}.tmp", name));
        tokio::fs::write(&temp_path, bytes).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(name = %name, size = bytes.len(), "Stored photo on filesystem");
        Ok(name)
    }

    async fn download(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        match tokio::fs::read(self.file_path(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, name: &str) -> StorageResult<bool> {
        match tokio::fs::remove_file(self.file_path(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        match tokio::fs::metadata(self.file_path(name)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.container, name)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
