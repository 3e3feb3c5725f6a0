use listings::config::{StorageBackend, StorageConfig};
use listings::error::AppError;
use listings::storage::{ObjectStorage, PresignedUrl, S3ObjectStorage, StorageError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Development signer producing unsigned, deterministic URLs under a public base URL.
#[derive(Debug, Clone)]
pub(crate) struct LocalObjectStorage {
    base_url: String,
    upload_ttl: Duration,
    download_ttl: Duration,
}

impl LocalObjectStorage {
    pub(crate) fn new(base_url: &str, upload_ttl: Duration, download_ttl: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            upload_ttl,
            download_ttl,
        }
    }

    pub(crate) fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            &config.public_base_url,
            config.upload_ttl,
            config.download_ttl,
        )
    }

    fn sign(&self, key: &str, operation: &str, content_type: &str, ttl: Duration) -> PresignedUrl {
        let mut presigned = PresignedUrl::expiring_in(String::new(), ttl);
        presigned.url = format!(
            "{}/{}?op={}&content-type={}&expires={}",
            self.base_url,
            key,
            operation,
            content_type,
            presigned.expires_at.timestamp()
        );
        presigned
    }
}

#[async_trait::async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload_url(&self, key: &str, content_type: &str) -> Result<PresignedUrl, StorageError> {
        Ok(self.sign(key, "put", content_type, self.upload_ttl))
    }

    async fn download_url(&self, key: &str) -> Result<PresignedUrl, StorageError> {
        let content_type = mime_guess::from_path(key).first_or_octet_stream();
        Ok(self.sign(key, "get", content_type.essence_str(), self.download_ttl))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        info!(%key, "local storage delete acknowledged");
        Ok(())
    }
}

pub(crate) async fn build_storage(
    config: &StorageConfig,
) -> Result<Arc<dyn ObjectStorage>, AppError> {
    let storage: Arc<dyn ObjectStorage> = match config.backend {
        StorageBackend::Local => Arc::new(LocalObjectStorage::from_config(config)),
        StorageBackend::S3 => Arc::new(S3ObjectStorage::from_config(config).await?),
    };
    info!(backend = ?config.backend, "object storage configured");
    Ok(storage)
}
