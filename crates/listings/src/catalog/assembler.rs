use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{
    AttachedMedia, ListingAggregate, ListingCounters, ListingDetails, ListingId, ListingLocation,
    ListingStatus, MediaId, PropertyType, User, UserId,
};
use super::error::ListingError;
use super::page::Page;
use super::store::ListingStore;
use crate::storage::ObjectStorage;

/// Denormalized listing as returned by every read path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingView {
    pub listing_id: ListingId,
    pub title: String,
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub status: ListingStatus,
    pub price: Decimal,
    pub owner: OwnerView,
    pub details: Option<ListingDetails>,
    pub location: Option<ListingLocation>,
    pub counters: Option<ListingCounters>,
    pub media: Vec<MediaView>,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerView {
    pub user_id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl From<&User> for OwnerView {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Media entry with an access URL minted for this response only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaView {
    pub media_id: MediaId,
    pub url: String,
    pub url_expires_at: DateTime<Utc>,
    pub content_type: String,
    pub sort_order: i32,
    pub caption: Option<String>,
}

/// Builds [`ListingView`]s from loaded aggregates.
///
/// Pages fetch media for all of their listings in a single store lookup and group it by listing
/// before any view is built, so the number of media queries does not grow with the page size.
pub struct ResponseAssembler<S> {
    store: Arc<S>,
    storage: Arc<dyn ObjectStorage>,
}

impl<S> Clone for ResponseAssembler<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            storage: self.storage.clone(),
        }
    }
}

impl<S> ResponseAssembler<S>
where
    S: ListingStore + 'static,
{
    pub fn new(store: Arc<S>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { store, storage }
    }

    pub async fn assemble(&self, aggregate: ListingAggregate) -> Result<ListingView, ListingError> {
        let media = self.store.media_for_listing(aggregate.id())?;
        self.build(aggregate, media).await
    }

    pub async fn assemble_page(
        &self,
        page: Page<ListingAggregate>,
    ) -> Result<Page<ListingView>, ListingError> {
        let ids: Vec<ListingId> = page.items.iter().map(ListingAggregate::id).collect();
        let mut grouped = if ids.is_empty() {
            HashMap::new()
        } else {
            group_by_listing(self.store.media_for_listings(&ids)?)
        };

        let Page {
            items,
            page,
            size,
            total_items,
            total_pages,
        } = page;

        let views = try_join_all(items.into_iter().map(|aggregate| {
            let media = grouped.remove(&aggregate.id()).unwrap_or_default();
            self.build(aggregate, media)
        }))
        .await?;

        Ok(Page {
            items: views,
            page,
            size,
            total_items,
            total_pages,
        })
    }

    async fn build(
        &self,
        aggregate: ListingAggregate,
        media: Vec<AttachedMedia>,
    ) -> Result<ListingView, ListingError> {
        let media = self.resolve_urls(media).await?;
        let ListingAggregate {
            listing,
            owner,
            details,
            location,
            counters,
        } = aggregate;

        Ok(ListingView {
            listing_id: listing.id,
            title: listing.title,
            description: listing.description,
            property_type: listing.property_type,
            status: listing.status,
            price: listing.price,
            owner: OwnerView::from(&owner),
            details,
            location,
            counters,
            media,
            created_at: listing.created_at,
            published_at: listing.published_at,
            updated_at: listing.updated_at,
        })
    }

    async fn resolve_urls(&self, media: Vec<AttachedMedia>) -> Result<Vec<MediaView>, ListingError> {
        let live = media
            .into_iter()
            .filter(|attached| attached.asset.deleted_at.is_none());

        let views = try_join_all(live.map(|attached| async move {
            let presigned = self.storage.download_url(&attached.asset.storage_key).await?;
            Ok::<_, ListingError>(MediaView {
                media_id: attached.asset.id,
                url: presigned.url,
                url_expires_at: presigned.expires_at,
                content_type: attached.asset.content_type,
                sort_order: attached.sort_order,
                caption: attached.asset.caption,
            })
        }))
        .await?;

        Ok(views)
    }
}

/// Groups already ordered media rows by listing, keeping the per-listing order intact.
pub(crate) fn group_by_listing(rows: Vec<AttachedMedia>) -> HashMap<ListingId, Vec<AttachedMedia>> {
    let mut grouped: HashMap<ListingId, Vec<AttachedMedia>> = HashMap::new();
    for row in rows {
        grouped.entry(row.listing_id).or_default().push(row);
    }
    grouped
}
