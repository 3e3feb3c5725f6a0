use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;

use super::{ObjectStorage, PresignedUrl, StorageError};
use crate::config::StorageConfig;

/// S3-backed presigner. Upload URLs default to 15 minutes and download URLs to 60 minutes.
#[derive(Debug, Clone)]
pub struct S3ObjectStorage {
    inner: aws_sdk_s3::Client,
    bucket: String,
    upload_ttl: Duration,
    download_ttl: Duration,
}

impl S3ObjectStorage {
    pub fn new(
        inner: aws_sdk_s3::Client,
        bucket: impl Into<String>,
        upload_ttl: Duration,
        download_ttl: Duration,
    ) -> Self {
        Self {
            inner,
            bucket: bucket.into(),
            upload_ttl,
            download_ttl,
        }
    }

    /// Builds a client from the ambient AWS environment (region, credentials profile).
    pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let bucket = config.bucket.clone().ok_or_else(|| {
            StorageError::Misconfigured("STORAGE_BUCKET is required for the s3 backend".into())
        })?;
        let shared = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Ok(Self::new(
            aws_sdk_s3::Client::new(&shared),
            bucket,
            config.upload_ttl,
            config.download_ttl,
        ))
    }

    fn presigning(
        &self,
        operation: &'static str,
        key: &str,
        ttl: Duration,
    ) -> Result<PresigningConfig, StorageError> {
        PresigningConfig::expires_in(ttl).map_err(|err| StorageError::Presign {
            operation,
            key: key.to_string(),
            reason: err.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl ObjectStorage for S3ObjectStorage {
    #[tracing::instrument(skip(self))]
    async fn upload_url(&self, key: &str, content_type: &str) -> Result<PresignedUrl, StorageError> {
        let presigned = self
            .inner
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(self.presigning("upload", key, self.upload_ttl)?)
            .await
            .map_err(|err| StorageError::Presign {
                operation: "upload",
                key: key.to_string(),
                reason: err.to_string(),
            })?;

        Ok(PresignedUrl::expiring_in(
            presigned.uri().to_string(),
            self.upload_ttl,
        ))
    }

    #[tracing::instrument(skip(self))]
    async fn download_url(&self, key: &str) -> Result<PresignedUrl, StorageError> {
        let presigned = self
            .inner
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(self.presigning("download", key, self.download_ttl)?)
            .await
            .map_err(|err| StorageError::Presign {
                operation: "download",
                key: key.to_string(),
                reason: err.to_string(),
            })?;

        Ok(PresignedUrl::expiring_in(
            presigned.uri().to_string(),
            self.download_ttl,
        ))
    }

    #[tracing::instrument(skip(self))]
    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.inner
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| StorageError::Request {
                key: key.to_string(),
                reason: err.to_string(),
            })?;
        Ok(())
    }
}
