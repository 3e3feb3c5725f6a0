use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::accounts::resolve_caller;
use super::assembler::{ListingView, ResponseAssembler};
use super::domain::{Association, AssociationKind, ListingId, UserListingKey};
use super::error::ListingError;
use super::page::{Page, PageRequest};
use super::store::{ListingStore, Mutation, StoreError, WriteBatch};
use crate::identity::VerifiedIdentity;

/// Favorite and saved associations plus the counters they drive.
///
/// Both kinds share one code path; the kind only selects the association table and counter.
/// Counters are adjusted as deltas inside the same batch as the association write.
pub struct EngagementManager<S> {
    store: Arc<S>,
    assembler: ResponseAssembler<S>,
}

impl<S> EngagementManager<S>
where
    S: ListingStore + 'static,
{
    pub fn new(store: Arc<S>, assembler: ResponseAssembler<S>) -> Self {
        Self { store, assembler }
    }

    pub fn add(
        &self,
        kind: AssociationKind,
        caller: &VerifiedIdentity,
        listing_id: ListingId,
    ) -> Result<(), ListingError> {
        let user = resolve_caller(self.store.as_ref(), caller)?;
        if self.store.listing(listing_id)?.is_none() {
            return Err(ListingError::not_found("listing", listing_id));
        }

        let key = UserListingKey(user.id, listing_id);
        if self.store.association_exists(kind, key)? {
            return Err(already_exists(kind, listing_id));
        }

        let mut batch = WriteBatch::new();
        batch.push(Mutation::InsertAssociation(Association {
            kind,
            key,
            created_at: Utc::now(),
        }));
        self.push_counter_delta(&mut batch, kind, listing_id, 1)?;

        self.store.commit(batch).map_err(|err| match err {
            StoreError::Conflict(_) => already_exists(kind, listing_id),
            StoreError::NotFound(_) => ListingError::not_found("listing", listing_id),
            other => ListingError::Store(other),
        })?;

        info!(%listing_id, user_id = %user.id, kind = kind.label(), "association added");
        Ok(())
    }

    pub fn remove(
        &self,
        kind: AssociationKind,
        caller: &VerifiedIdentity,
        listing_id: ListingId,
    ) -> Result<(), ListingError> {
        let user = resolve_caller(self.store.as_ref(), caller)?;
        let key = UserListingKey(user.id, listing_id);
        if !self.store.association_exists(kind, key)? {
            return Err(ListingError::not_found(kind.label(), listing_id));
        }

        let mut batch = WriteBatch::new();
        batch.push(Mutation::DeleteAssociation { kind, key });
        self.push_counter_delta(&mut batch, kind, listing_id, -1)?;

        self.store.commit(batch).map_err(|err| match err {
            StoreError::NotFound(_) => ListingError::not_found(kind.label(), listing_id),
            other => ListingError::Store(other),
        })?;

        info!(%listing_id, user_id = %user.id, kind = kind.label(), "association removed");
        Ok(())
    }

    /// The caller's associated listings, most recently associated first by default.
    pub async fn list(
        &self,
        kind: AssociationKind,
        caller: &VerifiedIdentity,
        page: &PageRequest,
    ) -> Result<Page<ListingView>, ListingError> {
        let user = resolve_caller(self.store.as_ref(), caller)?;
        let aggregates = self.store.associated_listings(kind, user.id, page)?;
        self.assembler.assemble_page(aggregates).await
    }

    fn push_counter_delta(
        &self,
        batch: &mut WriteBatch,
        kind: AssociationKind,
        listing_id: ListingId,
        delta: i64,
    ) -> Result<(), ListingError> {
        if self.store.counters(listing_id)?.is_none() {
            warn!(%listing_id, kind = kind.label(), "counters row missing; skipping adjustment");
            return Ok(());
        }
        batch.push(Mutation::AdjustCounter {
            listing_id,
            counter: kind.counter(),
            delta,
        });
        Ok(())
    }
}

fn already_exists(kind: AssociationKind, listing_id: ListingId) -> ListingError {
    ListingError::AlreadyExists(format!("listing {listing_id} is already a {}", kind.label()))
}
