use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;

use crate::errors::AppError;

/// Outcome of a best-effort blob deletion.
///
/// Deletion never fails a surrounding operation; callers receive the outcome
/// and may discard it after logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The delete request was accepted by the backend.
    Deleted,
    /// There was no stored blob reference to delete.
    Nothing,
    /// The backend rejected the delete; the reason is kept for logging.
    Ignored(String),
}

/// S3-compatible blob storage operations.
///
/// Abstracted as a trait so tests can run against an in-memory store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads `bytes` under `key`.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), AppError>;

    /// Best-effort delete. Backend errors are folded into the outcome,
    /// never returned as `Err`.
    async fn delete(&self, key: &str) -> DeleteOutcome;
}

/// S3 implementation of [`BlobStore`].
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("Failed to put object '{key}': {e}")))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> DeleteOutcome {
        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            // S3 reports success for missing keys as well.
            Ok(_) => DeleteOutcome::Deleted,
            Err(e) => DeleteOutcome::Ignored(e.to_string()),
        }
    }
}
