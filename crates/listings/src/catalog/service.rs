use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::accounts::resolve_caller;
use super::assembler::{ListingView, ResponseAssembler};
use super::domain::{ListingAggregate, ListingId, PriceChange, User, UserId};
use super::error::ListingError;
use super::page::{Page, PageRequest};
use super::pricing::record_if_changed;
use super::requests::{CreateListingRequest, MediaItem, UpdateListingRequest};
use super::search::{Criterion, ListingPredicate, SearchFilters};
use super::store::{ListingStore, Mutation, StoreError, WriteBatch};
use crate::identity::VerifiedIdentity;

/// Orchestrates listing writes and reads. Every write is committed as one atomic batch.
pub struct ListingService<S> {
    store: Arc<S>,
    assembler: ResponseAssembler<S>,
}

impl<S> ListingService<S>
where
    S: ListingStore + 'static,
{
    pub fn new(store: Arc<S>, assembler: ResponseAssembler<S>) -> Self {
        Self { store, assembler }
    }

    /// Persists the listing, its satellites, zeroed counters, and any media in one batch.
    pub fn create(
        &self,
        owner: &VerifiedIdentity,
        request: CreateListingRequest,
    ) -> Result<ListingId, ListingError> {
        request.validate()?;
        let owner = resolve_caller(self.store.as_ref(), owner)?;
        let now = Utc::now();
        let id = ListingId::random();

        let mut batch = WriteBatch::new();
        batch.push(Mutation::InsertListing {
            listing: request.to_listing(id, owner.id, now),
            details: request.to_details(id),
            location: request.to_location(id),
            counters: request.to_counters(id),
        });
        attach_media(&mut batch, &request.media, id, owner.id, now);

        self.store.commit(batch)?;
        info!(listing_id = %id, owner_id = %owner.id, media = request.media.len(), "listing created");
        Ok(id)
    }

    /// Full view of a listing whether or not it has been archived.
    pub async fn get(&self, id: ListingId) -> Result<ListingView, ListingError> {
        let aggregate = self.load(id)?;
        self.assembler.assemble(aggregate).await
    }

    /// Owner-only partial update. Price changes are recorded before the price is overwritten;
    /// media items are appended to the existing set.
    pub async fn update(
        &self,
        caller: &VerifiedIdentity,
        id: ListingId,
        request: UpdateListingRequest,
    ) -> Result<ListingView, ListingError> {
        request.validate()?;
        let aggregate = self.load(id)?;
        let owner = self.authorize_owner(caller, &aggregate)?;
        let now = Utc::now();

        let mut listing = aggregate.listing.clone();
        let expected_version = listing.version;
        let price_change = record_if_changed(&mut listing, request.price, now);
        request.merge_into(&mut listing, now);

        let mut batch = WriteBatch::new();
        batch.push(Mutation::UpdateListing {
            listing,
            expected_version,
        });
        if let Some(change) = &price_change {
            batch.push(Mutation::AppendPriceChange(change.clone()));
        }

        if let Some(patch) = request.details_patch() {
            let mut details = aggregate
                .details
                .clone()
                .ok_or_else(|| ListingError::not_found("listing details", id))?;
            patch.apply_to(&mut details);
            batch.push(Mutation::UpdateDetails(details));
        }
        if let Some(patch) = request.location_patch() {
            let mut location = aggregate
                .location
                .clone()
                .ok_or_else(|| ListingError::not_found("listing location", id))?;
            patch.apply_to(&mut location);
            batch.push(Mutation::UpdateLocation(location));
        }
        attach_media(&mut batch, &request.media, id, owner.id, now);

        self.commit_listing_write(id, batch)?;
        if let Some(change) = price_change {
            info!(
                listing_id = %id,
                old_price = %change.old_price,
                new_price = %change.new_price,
                "price change recorded"
            );
        }
        info!(listing_id = %id, "listing updated");

        self.get(id).await
    }

    /// Archives the listing. Archiving an already archived listing keeps the original
    /// deletion time; a deleted listing whose status was since changed is archived again.
    pub fn delete(&self, caller: &VerifiedIdentity, id: ListingId) -> Result<(), ListingError> {
        let aggregate = self.load(id)?;
        self.authorize_owner(caller, &aggregate)?;

        let mut listing = aggregate.listing;
        if listing.is_archived() {
            debug!(listing_id = %id, "listing already archived");
            return Ok(());
        }

        let expected_version = listing.version;
        listing.archive(Utc::now());
        let mut batch = WriteBatch::new();
        batch.push(Mutation::UpdateListing {
            listing,
            expected_version,
        });

        self.commit_listing_write(id, batch)?;
        info!(listing_id = %id, "listing archived");
        Ok(())
    }

    /// Published, non-archived listings matching every supplied filter.
    pub async fn search(
        &self,
        filters: &SearchFilters,
        page: &PageRequest,
    ) -> Result<Page<ListingView>, ListingError> {
        let predicate = filters.to_predicate();
        debug!(criteria = ?predicate.names(), "searching listings");
        let aggregates = self.store.query_listings(&predicate, page)?;
        self.assembler.assemble_page(aggregates).await
    }

    /// The caller's own listings in any status. Archived listings are only included on request.
    pub async fn list_mine(
        &self,
        owner: &VerifiedIdentity,
        include_archived: bool,
        page: &PageRequest,
    ) -> Result<Page<ListingView>, ListingError> {
        let owner = resolve_caller(self.store.as_ref(), owner)?;
        let predicate = owned_by(owner.id, include_archived);
        let aggregates = self.store.query_listings(&predicate, page)?;
        self.assembler.assemble_page(aggregates).await
    }

    /// Price changes of an existing listing, oldest first.
    pub fn price_history(&self, id: ListingId) -> Result<Vec<PriceChange>, ListingError> {
        self.load(id)?;
        Ok(self.store.price_history(id)?)
    }

    fn load(&self, id: ListingId) -> Result<ListingAggregate, ListingError> {
        self.store
            .listing(id)?
            .ok_or_else(|| ListingError::not_found("listing", id))
    }

    /// Unregistered callers cannot own anything and are rejected like any other non-owner.
    fn authorize_owner(
        &self,
        caller: &VerifiedIdentity,
        aggregate: &ListingAggregate,
    ) -> Result<User, ListingError> {
        match self.store.user_by_subject(&caller.subject)? {
            Some(user) if aggregate.listing.is_owned_by(user.id) => Ok(user),
            _ => Err(ListingError::Unauthorized),
        }
    }

    fn commit_listing_write(&self, id: ListingId, batch: WriteBatch) -> Result<(), ListingError> {
        self.store.commit(batch).map_err(|err| match err {
            StoreError::VersionMismatch { listing_id, .. } => ListingError::StaleWrite(listing_id),
            StoreError::NotFound(_) => ListingError::not_found("listing", id),
            other => ListingError::Store(other),
        })
    }
}

fn owned_by(owner: UserId, include_archived: bool) -> ListingPredicate {
    let builder = ListingPredicate::builder().and(Criterion::OwnedBy(owner));
    if include_archived {
        builder.build()
    } else {
        builder.and(Criterion::NotDeleted).build()
    }
}

fn attach_media(
    batch: &mut WriteBatch,
    items: &[MediaItem],
    listing_id: ListingId,
    owner_id: UserId,
    now: DateTime<Utc>,
) {
    for item in items {
        let (asset, attachment) = item.attach(listing_id, owner_id, now);
        batch.push(Mutation::AttachMedia { asset, attachment });
    }
}
