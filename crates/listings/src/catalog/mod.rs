//! Listing lifecycle and engagement aggregation.
//!
//! Writes (create, update, archive, favorite, save) are expressed as [`WriteBatch`]es that the
//! store commits atomically. Reads load aggregates from the store and hand them to the
//! [`ResponseAssembler`], which batches media lookups per page and mints access URLs on the fly.

pub mod accounts;
pub mod assembler;
pub mod domain;
pub mod engagement;
pub mod error;
pub mod media;
pub mod memory;
pub mod page;
pub mod pricing;
pub mod requests;
pub mod router;
pub mod search;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use accounts::{AccountService, RegistrationProfile};
pub use assembler::{ListingView, MediaView, OwnerView, ResponseAssembler};
pub use domain::{
    Association, AssociationKind, AttachedMedia, EngagementCounter, FacingDirection, Listing,
    ListingAggregate, ListingCondition, ListingCounters, ListingDetails, ListingId,
    ListingLocation, ListingMedia, ListingMediaKey, ListingStatus, MediaAsset, MediaId,
    PriceChange, PriceChangeId, PropertyType, User, UserId, UserListingKey,
};
pub use engagement::EngagementManager;
pub use error::ListingError;
pub use media::{MediaBroker, UploadRequest, UploadTicket};
pub use memory::MemoryStore;
pub use page::{Page, PageQuery, PageRequest, SortDirection, SortField};
pub use pricing::record_if_changed;
pub use requests::{
    CreateListingRequest, DetailsInput, DetailsPatch, LocationInput, LocationPatch, MediaItem,
    UpdateListingRequest,
};
pub use router::{catalog_router, status_for, ApiError, CatalogState};
pub use search::{Criterion, ListingPredicate, SearchFilters};
pub use service::ListingService;
pub use store::{ListingStore, Mutation, StoreError, WriteBatch};
