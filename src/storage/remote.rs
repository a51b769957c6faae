//! Remote object storage backend (S3-compatible).
//!
//! Works against AWS S3, MinIO, and other S3-compatible services. The
//! connection string is the endpoint URL; credentials come from the standard
//! AWS environment/credential chain. The container name maps to the bucket.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;
use url::Url;

use super::{StorageError, StorageProvider, StorageResult, unique_name};

pub struct RemoteStorage {
    client: aws_sdk_s3::Client,
    endpoint: String,
    bucket: String,
    bucket_ready: tokio::sync::OnceCell<()>,
}

impl RemoteStorage {
    /// Connect to the object store. Validates the connection string and
    /// fails fast on malformed endpoints; no network call is made here.
    pub async fn new(connection_string: &str, bucket: &str) -> StorageResult<Self> {
        let endpoint = Url::parse(connection_string)
            .map_err(|e| StorageError::Config(format!("invalid connection string: {}", e)))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(StorageError::Config(format!(
                "connection string must be an http(s) endpoint URL, got scheme '{}'",
                endpoint.scheme()
            )));
        }

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(endpoint.as_str())
            // Path-style addressing works for MinIO and friends
            .force_path_style(true);
        if sdk_config.region().is_none() {
            builder = builder.region(aws_config::Region::new("us-east-1"));
        }

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            endpoint: endpoint.as_str().trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            bucket_ready: tokio::sync::OnceCell::new(),
        })
    }

    /// Provision the bucket on first write, like the local backend creates
    /// its directory. A bucket that already exists counts as provisioned.
    async fn ensure_bucket(&self) -> StorageResult<()> {
        self.bucket_ready
            .get_or_try_init(|| async {
                match self.client.create_bucket().bucket(&self.bucket).send().await {
                    Ok(_) => {
                        debug!(bucket = %self.bucket, "Created storage bucket");
                        Ok(())
                    }
                    Err(e)
                        if e.as_service_error().is_some_and(|s| {
                            s.is_bucket_already_owned_by_you() || s.is_bucket_already_exists()
                        }) =>
                    {
                        Ok(())
                    }
                    Err(e) => Err(StorageError::Remote(e.to_string())),
                }
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl StorageProvider for RemoteStorage {
    async fn upload(
        &self,
        bytes: &[u8],
        original_name: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        let name = unique_name(original_name);
        self.ensure_bucket().await?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&name)
            .content_type(content_type)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|e| StorageError::Remote(e.to_string()))?;

        debug!(name = %name, size = bytes.len(), bucket = %self.bucket, "Stored photo in object store");
        Ok(name)
    }

    async fn download(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await;

        match result {
            Ok(out) => {
                let bytes = out
                    .body
                    .collect()
                    .await
                    .map_err(|e| StorageError::Remote(e.to_string()))?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(e) if e.as_service_error().is_some_and(|s| s.is_no_such_key()) => Ok(None),
            Err(e) => Err(StorageError::Remote(e.to_string())),
        }
    }

    async fn delete(&self, name: &str) -> StorageResult<bool> {
        // S3 deletes are blind; check first so we can report whether the
        // object actually existed, matching the local backend's contract.
        if !self.exists(name).await? {
            return Ok(false);
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| StorageError::Remote(e.to_string()))?;

        Ok(true)
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|s| s.is_not_found()) => Ok(false),
            Err(e) => Err(StorageError::Remote(e.to_string())),
        }
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, name)
    }

    fn backend_name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[tokio::test]
    async fn test_rejects_malformed_connection_string() {
        let result = RemoteStorage::new("not a url", "photos").await;
        assert!(matches!(result, Err(StorageError::Config(_))));
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let result = RemoteStorage::new("ftp://blobs.example.com", "photos").await;
        assert!(matches!(result, Err(StorageError::Config(_))));
    }

    #[tokio::test]
    async fn test_upload_against_unreachable_endpoint_is_an_error() {
        // Nothing listens on port 1; bucket provisioning must surface the
        // transport failure instead of panicking or silently skipping it
        let storage = RemoteStorage::new("http://127.0.0.1:1", "photos")
            .await
            .unwrap();
        let result = storage.upload(b"x", "a.jpg", "image/jpeg").await;
        assert!(matches!(result, Err(StorageError::Remote(_))));
    }

    #[tokio::test]
    async fn test_url_for_is_absolute() {
        let storage = RemoteStorage::new("https://minio.example.com:9000/", "photos")
            .await
            .unwrap();
        assert_eq!(
            storage.url_for("abc.jpg"),
            "https://minio.example.com:9000/photos/abc.jpg"
        );
    }
}
