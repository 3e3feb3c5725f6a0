use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub Uuid);

impl ListingId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for registered marketplace users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(pub Uuid);

impl MediaId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceChangeId(pub Uuid);

impl PriceChangeId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Apartment,
    House,
    Duplex,
    Plot,
    Commercial,
}

/// Publication state of a listing. `Archived` is only reached through deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Draft,
    Published,
    Archived,
    Sold,
}

impl ListingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ListingStatus::Draft => "draft",
            ListingStatus::Published => "published",
            ListingStatus::Archived => "archived",
            ListingStatus::Sold => "sold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingCondition {
    BrandNew,
    Good,
    NeedsRenovation,
    UnderConstruction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingDirection {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

/// Marketplace account, keyed by the subject issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub subject: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Primary listing row. Details, location, and counters live in 1:1 satellites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub owner_id: UserId,
    pub property_type: PropertyType,
    pub status: ListingStatus,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Bumped by the store on every persisted update of this row.
    pub version: u64,
}

impl Listing {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    pub fn is_archived(&self) -> bool {
        self.status == ListingStatus::Archived && self.deleted_at.is_some()
    }

    /// Moves the listing to `status`, stamping `published_at` the first time it is published.
    pub fn transition(&mut self, status: ListingStatus, now: DateTime<Utc>) {
        self.status = status;
        if status == ListingStatus::Published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
    }

    /// Marks the listing archived. An earlier deletion time is kept.
    pub fn archive(&mut self, now: DateTime<Utc>) {
        self.status = ListingStatus::Archived;
        self.deleted_at.get_or_insert(now);
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub listing_id: ListingId,
    pub year_built: i32,
    pub condition: ListingCondition,
    pub facing_direction: Option<FacingDirection>,
    pub bedrooms: u16,
    pub bathrooms: u16,
    pub balconies: u16,
    pub floor_level: Option<i16>,
    pub furnished: Option<bool>,
    pub parking_area: Option<u32>,
    pub pet_friendly: Option<bool>,
    pub lot_area: Option<u32>,
    pub living_area: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingLocation {
    pub listing_id: ListingId,
    pub address_line: String,
    pub area: String,
    pub district: String,
    pub zip_code: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
}

/// Engagement counters kept per listing so reads never rescan association tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingCounters {
    pub listing_id: ListingId,
    pub view_count: u64,
    pub favorite_count: u64,
    pub save_count: u64,
}

impl ListingCounters {
    pub fn zeroed(listing_id: ListingId) -> Self {
        Self {
            listing_id,
            view_count: 0,
            favorite_count: 0,
            save_count: 0,
        }
    }

    /// Applies a signed delta to one counter, flooring at zero.
    pub fn adjust(&mut self, counter: EngagementCounter, delta: i64) {
        let slot = match counter {
            EngagementCounter::Views => &mut self.view_count,
            EngagementCounter::Favorites => &mut self.favorite_count,
            EngagementCounter::Saves => &mut self.save_count,
        };
        *slot = if delta >= 0 {
            slot.saturating_add(delta.unsigned_abs())
        } else {
            slot.saturating_sub(delta.unsigned_abs())
        };
    }

    pub fn get(&self, counter: EngagementCounter) -> u64 {
        match counter {
            EngagementCounter::Views => self.view_count,
            EngagementCounter::Favorites => self.favorite_count,
            EngagementCounter::Saves => self.save_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementCounter {
    Views,
    Favorites,
    Saves,
}

/// Uploaded object reference. Only the storage key is persisted, never a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: MediaId,
    pub owner_id: UserId,
    pub storage_key: String,
    pub content_type: String,
    pub byte_size: u64,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Composite identity of a listing/media association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingMediaKey(pub ListingId, pub MediaId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingMedia {
    pub key: ListingMediaKey,
    pub sort_order: i32,
}

/// Association row joined with its media asset, as returned by media lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedMedia {
    pub listing_id: ListingId,
    pub sort_order: i32,
    pub asset: MediaAsset,
}

/// Composite identity of a favorite or saved association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserListingKey(pub UserId, pub ListingId);

impl UserListingKey {
    pub fn user_id(&self) -> UserId {
        self.0
    }

    pub fn listing_id(&self) -> ListingId {
        self.1
    }
}

/// The two symmetric user/listing association kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    Favorite,
    Saved,
}

impl AssociationKind {
    pub fn counter(&self) -> EngagementCounter {
        match self {
            AssociationKind::Favorite => EngagementCounter::Favorites,
            AssociationKind::Saved => EngagementCounter::Saves,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssociationKind::Favorite => "favorite",
            AssociationKind::Saved => "saved listing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub kind: AssociationKind,
    pub key: UserListingKey,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit record of a single price change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    pub id: PriceChangeId,
    pub listing_id: ListingId,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub changed_at: DateTime<Utc>,
}

/// A listing loaded together with its owner and 1:1 satellites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingAggregate {
    pub listing: Listing,
    pub owner: User,
    pub details: Option<ListingDetails>,
    pub location: Option<ListingLocation>,
    pub counters: Option<ListingCounters>,
}

impl ListingAggregate {
    pub fn id(&self) -> ListingId {
        self.listing.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_floor_at_zero() {
        let mut counters = ListingCounters::zeroed(ListingId::random());
        counters.adjust(EngagementCounter::Favorites, 1);
        counters.adjust(EngagementCounter::Favorites, -1);
        counters.adjust(EngagementCounter::Favorites, -1);
        assert_eq!(counters.favorite_count, 0);

        counters.adjust(EngagementCounter::Saves, 2);
        assert_eq!(counters.get(EngagementCounter::Saves), 2);
        assert_eq!(counters.view_count, 0);
    }

    #[test]
    fn transition_stamps_publication_once() {
        let now = Utc::now();
        let later = now + chrono::Duration::hours(1);
        let mut listing = Listing {
            id: ListingId::random(),
            owner_id: UserId::random(),
            property_type: PropertyType::House,
            status: ListingStatus::Draft,
            title: "Garden house".to_string(),
            description: None,
            price: Decimal::from(250_000),
            created_at: now,
            published_at: None,
            updated_at: now,
            deleted_at: None,
            version: 0,
        };

        listing.transition(ListingStatus::Published, now);
        listing.transition(ListingStatus::Draft, later);
        listing.transition(ListingStatus::Published, later);

        assert_eq!(listing.published_at, Some(now));
        assert_eq!(listing.status, ListingStatus::Published);
    }
}
