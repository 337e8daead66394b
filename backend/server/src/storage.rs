//! # Blob Store
//!
//! Object storage holding dashboard documents, addressed by path
//! (`dashboards/<count>/<name>`).
//!
//! The S3 backend works against AWS or anything speaking the S3 API
//! (MinIO, LocalStack) when `S3_ENDPOINT` is set. Retries and timeouts are
//! whatever the SDK defaults give; failures are surfaced as-is.
use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{Client, error::SdkError, primitives::ByteStream};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 error for key '{key}': {message}")]
    S3 { key: String, message: String },

    #[error("Failed to read body of '{key}': {message}")]
    Body { key: String, message: String },
}

impl StorageError {
    pub fn s3(key: impl Into<String>, message: impl Into<String>) -> Self {
        StorageError::S3 {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Full names of every blob starting with `prefix`, in no particular order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Writes `body` at `path`, replacing whatever was there.
    async fn put(&self, path: &str, body: Vec<u8>, content_type: &str)
    -> Result<(), StorageError>;

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError>;

    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

#[derive(Clone, Debug)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub async fn new(bucket: &str, endpoint: Option<&str>) -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::from_client(Client::from_conf(builder.build()), bucket)
    }

    pub fn from_client(client: Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut continuation_token = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|e| map_s3_error(e, prefix))?;

            names.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match response.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(prefix, found = names.len(), "Listed blobs");
        Ok(names)
    }

    async fn put(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| map_s3_error(e, path))?;

        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(map_s3_error(e, path)),
        };

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Body {
                key: path.to_string(),
                message: e.to_string(),
            })?
            .into_bytes();

        Ok(Some(bytes.to_vec()))
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(map_s3_error(e, path)),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| map_s3_error(e, path))?;

        Ok(())
    }
}

// Pattern match on SdkError, into_service_error() would lose the status
fn is_not_found<E>(err: &SdkError<E>) -> bool {
    match err {
        SdkError::ServiceError(service_err) => service_err.raw().status().as_u16() == 404,
        _ => false,
    }
}

fn map_s3_error<E: std::fmt::Debug>(err: SdkError<E>, key: &str) -> StorageError {
    match &err {
        SdkError::ServiceError(service_err) => {
            let status = service_err.raw().status().as_u16();
            StorageError::s3(key, format!("HTTP {status}: {err:?}"))
        }
        SdkError::TimeoutError(_) => StorageError::s3(key, format!("timeout: {err:?}")),
        SdkError::DispatchFailure(_) => StorageError::s3(key, format!("connection error: {err:?}")),
        _ => StorageError::s3(key, format!("{err:?}")),
    }
}

struct StoredBlob {
    body: Vec<u8>,
    content_type: String,
}

/// In-process blob store for local runs and tests.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub async fn content_type(&self, path: &str) -> Option<String> {
        self.blobs
            .read()
            .await
            .get(path)
            .map(|blob| blob.content_type.clone())
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .blobs
            .read()
            .await
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn put(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.blobs.write().await.insert(
            path.to_string(),
            StoredBlob {
                body,
                content_type: content_type.to_string(),
            },
        );

        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .blobs
            .read()
            .await
            .get(path)
            .map(|blob| blob.body.clone()))
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.blobs.read().await.contains_key(path))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.blobs.write().await.remove(path);

        Ok(())
    }
}
