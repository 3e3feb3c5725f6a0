//! Object storage collaborator.
//!
//! Only object keys are ever persisted. Access URLs are minted on demand through
//! [`ObjectStorage`] at read time and expire after a short window.

mod s3;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use s3::S3ObjectStorage;

/// Time-limited, credential-free URL for a single object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

impl PresignedUrl {
    pub fn expiring_in(url: impl Into<String>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            url: url.into(),
            expires_at: Utc::now() + ttl,
        }
    }
}

/// Issues presigned URLs and deletes objects by key.
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload_url(&self, key: &str, content_type: &str) -> Result<PresignedUrl, StorageError>;
    async fn download_url(&self, key: &str) -> Result<PresignedUrl, StorageError>;
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage is not configured: {0}")]
    Misconfigured(String),
    #[error("failed to presign {operation} for {key}: {reason}")]
    Presign {
        operation: &'static str,
        key: String,
        reason: String,
    },
    #[error("storage request failed for {key}: {reason}")]
    Request { key: String, reason: String },
}
