use super::domain::ListingId;
use super::store::StoreError;
use crate::storage::StorageError;

/// Error raised by the listing lifecycle, engagement, and account components.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },
    #[error("{0}")]
    AlreadyExists(String),
    #[error("you are not allowed to perform this operation")]
    Unauthorized,
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("listing {0} was modified concurrently, reload and retry")]
    StaleWrite(ListingId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ListingError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}
