use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::catalog::domain::{
    AssociationKind, AttachedMedia, ListingAggregate, ListingCondition, ListingCounters,
    ListingId, PriceChange, PropertyType, User, UserId, UserListingKey,
};
use crate::catalog::page::{Page, PageRequest};
use crate::catalog::requests::{CreateListingRequest, DetailsInput, LocationInput, MediaItem};
use crate::catalog::search::ListingPredicate;
use crate::catalog::store::{ListingStore, StoreError, WriteBatch};
use crate::catalog::{AccountService, CatalogState, MemoryStore};
use crate::config::PaginationConfig;
use crate::identity::{JwtIdentityVerifier, VerifiedIdentity};
use crate::storage::{ObjectStorage, PresignedUrl, StorageError};

pub(super) const JWT_SECRET: &str = "catalog-test-secret";

pub(super) fn identity(subject: &str) -> VerifiedIdentity {
    VerifiedIdentity {
        subject: subject.to_string(),
        name: Some(format!("User {subject}")),
        email: Some(format!("{subject}@example.com")),
        phone: None,
        picture: None,
    }
}

pub(super) fn register(store: &Arc<CountingStore>, subject: &str) -> User {
    AccountService::new(store.clone())
        .register(&identity(subject), None)
        .expect("registration succeeds")
}

pub(super) fn create_request(price: i64, publish: bool) -> CreateListingRequest {
    CreateListingRequest {
        title: "Three bedroom flat in Dhanmondi".to_string(),
        description: Some("South facing, close to the lake".to_string()),
        property_type: PropertyType::Apartment,
        price: Decimal::from(price),
        details: DetailsInput {
            year_built: 2018,
            condition: ListingCondition::Good,
            facing_direction: None,
            bedrooms: 3,
            bathrooms: 2,
            balconies: 1,
            floor_level: Some(4),
            furnished: Some(false),
            parking_area: None,
            pet_friendly: None,
            lot_area: None,
            living_area: 1450,
        },
        location: LocationInput {
            address_line: "House 12, Road 7".to_string(),
            area: "Dhanmondi".to_string(),
            district: "Dhaka".to_string(),
            zip_code: "1205".to_string(),
            latitude: Decimal::new(237461, 4),
            longitude: Decimal::new(903742, 4),
        },
        media: Vec::new(),
        publish,
    }
}

pub(super) fn media_item(key: &str, sort_order: i32) -> MediaItem {
    MediaItem {
        storage_key: key.to_string(),
        content_type: "image/jpeg".to_string(),
        sort_order,
        byte_size: 2048,
        caption: None,
    }
}

/// Memory store wrapper counting media lookups and commits.
#[derive(Default)]
pub(super) struct CountingStore {
    pub(super) inner: MemoryStore,
    single_media_queries: AtomicUsize,
    batch_media_queries: AtomicUsize,
    commits: AtomicUsize,
    hide_counters: AtomicBool,
}

impl CountingStore {
    pub(super) fn single_media_queries(&self) -> usize {
        self.single_media_queries.load(Ordering::SeqCst)
    }

    pub(super) fn batch_media_queries(&self) -> usize {
        self.batch_media_queries.load(Ordering::SeqCst)
    }

    pub(super) fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Makes counter lookups report a missing row, as after a partial migration.
    pub(super) fn hide_counters(&self) {
        self.hide_counters.store(true, Ordering::SeqCst);
    }
}

impl ListingStore for CountingStore {
    fn user_by_subject(&self, subject: &str) -> Result<Option<User>, StoreError> {
        self.inner.user_by_subject(subject)
    }

    fn insert_user(&self, user: User) -> Result<User, StoreError> {
        self.inner.insert_user(user)
    }

    fn listing(&self, id: ListingId) -> Result<Option<ListingAggregate>, StoreError> {
        self.inner.listing(id)
    }

    fn query_listings(
        &self,
        predicate: &ListingPredicate,
        page: &PageRequest,
    ) -> Result<Page<ListingAggregate>, StoreError> {
        self.inner.query_listings(predicate, page)
    }

    fn association_exists(
        &self,
        kind: AssociationKind,
        key: UserListingKey,
    ) -> Result<bool, StoreError> {
        self.inner.association_exists(kind, key)
    }

    fn associated_listings(
        &self,
        kind: AssociationKind,
        user: UserId,
        page: &PageRequest,
    ) -> Result<Page<ListingAggregate>, StoreError> {
        self.inner.associated_listings(kind, user, page)
    }

    fn counters(&self, id: ListingId) -> Result<Option<ListingCounters>, StoreError> {
        if self.hide_counters.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.counters(id)
    }

    fn media_for_listing(&self, id: ListingId) -> Result<Vec<AttachedMedia>, StoreError> {
        self.single_media_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.media_for_listing(id)
    }

    fn media_for_listings(&self, ids: &[ListingId]) -> Result<Vec<AttachedMedia>, StoreError> {
        self.batch_media_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.media_for_listings(ids)
    }

    fn price_history(&self, id: ListingId) -> Result<Vec<PriceChange>, StoreError> {
        self.inner.price_history(id)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit(batch)
    }
}

/// Storage double that signs deterministic URLs and records every key it was asked about.
#[derive(Default)]
pub(super) struct RecordingStorage {
    downloads: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(String, String)>>,
    deleted: Mutex<Vec<String>>,
}

impl RecordingStorage {
    pub(super) fn downloads(&self) -> Vec<String> {
        self.downloads.lock().expect("storage mutex poisoned").clone()
    }

    pub(super) fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().expect("storage mutex poisoned").clone()
    }

    pub(super) fn deleted(&self) -> Vec<String> {
        self.deleted.lock().expect("storage mutex poisoned").clone()
    }
}

#[async_trait::async_trait]
impl ObjectStorage for RecordingStorage {
    async fn upload_url(&self, key: &str, content_type: &str) -> Result<PresignedUrl, StorageError> {
        self.uploads
            .lock()
            .expect("storage mutex poisoned")
            .push((key.to_string(), content_type.to_string()));
        Ok(PresignedUrl::expiring_in(
            format!("https://uploads.test/{key}"),
            std::time::Duration::from_secs(900),
        ))
    }

    async fn download_url(&self, key: &str) -> Result<PresignedUrl, StorageError> {
        self.downloads
            .lock()
            .expect("storage mutex poisoned")
            .push(key.to_string());
        Ok(PresignedUrl::expiring_in(
            format!("https://media.test/{key}"),
            std::time::Duration::from_secs(3600),
        ))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.deleted
            .lock()
            .expect("storage mutex poisoned")
            .push(key.to_string());
        Ok(())
    }
}

/// Storage double whose presigner is down.
pub(super) struct OfflineStorage;

#[async_trait::async_trait]
impl ObjectStorage for OfflineStorage {
    async fn upload_url(&self, key: &str, _content_type: &str) -> Result<PresignedUrl, StorageError> {
        Err(StorageError::Request {
            key: key.to_string(),
            reason: "presigner offline".to_string(),
        })
    }

    async fn download_url(&self, key: &str) -> Result<PresignedUrl, StorageError> {
        Err(StorageError::Request {
            key: key.to_string(),
            reason: "presigner offline".to_string(),
        })
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        Err(StorageError::Request {
            key: key.to_string(),
            reason: "presigner offline".to_string(),
        })
    }
}

pub(super) struct Harness {
    pub(super) state: CatalogState<CountingStore>,
    pub(super) store: Arc<CountingStore>,
    pub(super) storage: Arc<RecordingStorage>,
    pub(super) verifier: Arc<JwtIdentityVerifier>,
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(CountingStore::default());
    let storage = Arc::new(RecordingStorage::default());
    let verifier = Arc::new(JwtIdentityVerifier::new(JWT_SECRET, None));
    let state = CatalogState::new(
        store.clone(),
        storage.clone(),
        verifier.clone(),
        PaginationConfig::default(),
    );
    Harness {
        state,
        store,
        storage,
        verifier,
    }
}

impl Harness {
    pub(super) fn bearer(&self, subject: &str) -> String {
        let token = self
            .verifier
            .issue(&identity(subject), chrono::Duration::minutes(5))
            .expect("token issued");
        format!("Bearer {token}")
    }

    pub(super) fn create(&self, owner: &str, price: i64, publish: bool) -> ListingId {
        self.state
            .listings
            .create(&identity(owner), create_request(price, publish))
            .expect("listing created")
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
