use super::domain::{
    Association, AssociationKind, AttachedMedia, EngagementCounter, Listing, ListingAggregate,
    ListingCounters, ListingDetails, ListingId, ListingLocation, ListingMedia, MediaAsset,
    PriceChange, User, UserId, UserListingKey,
};
use super::page::{Page, PageRequest};
use super::search::ListingPredicate;

/// Storage abstraction so the listing components can be exercised in isolation.
///
/// Reads return owned snapshots. Every write goes through [`ListingStore::commit`], which must
/// apply the whole batch atomically or nothing at all.
pub trait ListingStore: Send + Sync {
    fn user_by_subject(&self, subject: &str) -> Result<Option<User>, StoreError>;
    fn insert_user(&self, user: User) -> Result<User, StoreError>;

    fn listing(&self, id: ListingId) -> Result<Option<ListingAggregate>, StoreError>;
    fn query_listings(
        &self,
        predicate: &ListingPredicate,
        page: &PageRequest,
    ) -> Result<Page<ListingAggregate>, StoreError>;

    fn association_exists(
        &self,
        kind: AssociationKind,
        key: UserListingKey,
    ) -> Result<bool, StoreError>;
    /// Listings associated with `user`, ordered by when the association was made.
    fn associated_listings(
        &self,
        kind: AssociationKind,
        user: UserId,
        page: &PageRequest,
    ) -> Result<Page<ListingAggregate>, StoreError>;
    fn counters(&self, id: ListingId) -> Result<Option<ListingCounters>, StoreError>;

    /// Media of one listing ordered by sort order.
    fn media_for_listing(&self, id: ListingId) -> Result<Vec<AttachedMedia>, StoreError>;
    /// Media of every listing in `ids` in a single lookup, ordered by sort order.
    fn media_for_listings(&self, ids: &[ListingId]) -> Result<Vec<AttachedMedia>, StoreError>;

    fn price_history(&self, id: ListingId) -> Result<Vec<PriceChange>, StoreError>;

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    InsertListing {
        listing: Listing,
        details: ListingDetails,
        location: ListingLocation,
        counters: ListingCounters,
    },
    /// Replaces the listing row if its stored version still equals `expected_version`.
    UpdateListing {
        listing: Listing,
        expected_version: u64,
    },
    UpdateDetails(ListingDetails),
    UpdateLocation(ListingLocation),
    AttachMedia {
        asset: MediaAsset,
        attachment: ListingMedia,
    },
    AppendPriceChange(PriceChange),
    InsertAssociation(Association),
    DeleteAssociation {
        kind: AssociationKind,
        key: UserListingKey,
    },
    /// Signed delta applied to a counter, floored at zero. A missing counters row is a no-op.
    AdjustCounter {
        listing_id: ListingId,
        counter: EngagementCounter,
        delta: i64,
    },
}

/// Ordered set of mutations committed as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    mutations: Vec<Mutation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mutation: Mutation) -> &mut Self {
        self.mutations.push(mutation);
        self
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("version mismatch for listing {listing_id}: expected {expected}, found {found}")]
    VersionMismatch {
        listing_id: ListingId,
        expected: u64,
        found: u64,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
