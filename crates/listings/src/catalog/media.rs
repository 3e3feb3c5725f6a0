use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::error::ListingError;
use crate::storage::{ObjectStorage, PresignedUrl};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub category: String,
    pub file_name: String,
    pub content_type: String,
}

/// Where to PUT the object, and the key to reference it by afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadTicket {
    pub upload_url: String,
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

/// Hands out presigned URLs so clients upload directly to object storage.
pub struct MediaBroker {
    storage: Arc<dyn ObjectStorage>,
}

impl MediaBroker {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Reserves a fresh key `{category}/{uuid}/{file_name}` and presigns an upload for it.
    pub async fn request_upload(&self, request: &UploadRequest) -> Result<UploadTicket, ListingError> {
        let category = path_segment("category", &request.category)?;
        let file_name = path_segment("file_name", &request.file_name)?;
        let content_type = request
            .content_type
            .parse::<mime::Mime>()
            .map_err(|err| ListingError::validation("content_type", err.to_string()))?;

        let key = format!("{category}/{}/{file_name}", Uuid::new_v4());
        let presigned = self
            .storage
            .upload_url(&key, content_type.essence_str())
            .await?;

        info!(%key, content_type = content_type.essence_str(), "upload url issued");
        Ok(UploadTicket {
            upload_url: presigned.url,
            key,
            expires_at: presigned.expires_at,
        })
    }

    pub async fn download_url(&self, key: &str) -> Result<PresignedUrl, ListingError> {
        let key = object_key(key)?;
        Ok(self.storage.download_url(key).await?)
    }

    pub async fn delete_object(&self, key: &str) -> Result<(), ListingError> {
        let key = object_key(key)?;
        self.storage.delete_object(key).await?;
        info!(%key, "object deleted");
        Ok(())
    }
}

fn path_segment<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ListingError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ListingError::validation(field, "must not be blank"));
    }
    if value.contains('/') || value == "." || value == ".." {
        return Err(ListingError::validation(field, "must be a single path segment"));
    }
    Ok(value)
}

fn object_key(key: &str) -> Result<&str, ListingError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ListingError::validation("key", "must not be blank"));
    }
    Ok(key)
}
