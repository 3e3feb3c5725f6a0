use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    AssociationKind, AttachedMedia, Listing, ListingAggregate, ListingCounters, ListingDetails,
    ListingId, ListingLocation, ListingMediaKey, MediaAsset, MediaId, PriceChange, User, UserId,
    UserListingKey,
};
use super::page::{Page, PageRequest, SortDirection, SortField};
use super::search::ListingPredicate;
use super::store::{ListingStore, Mutation, StoreError, WriteBatch};

/// Process-local store. Batches are applied to a staged copy of the state and swapped in only
/// when every mutation succeeds, so a failing batch leaves no partial writes behind.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Debug, Default, Clone)]
struct StoreState {
    users: HashMap<UserId, User>,
    subjects: HashMap<String, UserId>,
    listings: HashMap<ListingId, Listing>,
    details: HashMap<ListingId, ListingDetails>,
    locations: HashMap<ListingId, ListingLocation>,
    counters: HashMap<ListingId, ListingCounters>,
    media: HashMap<MediaId, MediaAsset>,
    attachments: BTreeMap<ListingMediaKey, i32>,
    favorites: HashMap<UserListingKey, DateTime<Utc>>,
    saved: HashMap<UserListingKey, DateTime<Utc>>,
    price_history: Vec<PriceChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl StoreState {
    fn associations(&self, kind: AssociationKind) -> &HashMap<UserListingKey, DateTime<Utc>> {
        match kind {
            AssociationKind::Favorite => &self.favorites,
            AssociationKind::Saved => &self.saved,
        }
    }

    fn associations_mut(
        &mut self,
        kind: AssociationKind,
    ) -> &mut HashMap<UserListingKey, DateTime<Utc>> {
        match kind {
            AssociationKind::Favorite => &mut self.favorites,
            AssociationKind::Saved => &mut self.saved,
        }
    }

    fn aggregate(&self, listing: &Listing) -> Result<ListingAggregate, StoreError> {
        let owner = self.users.get(&listing.owner_id).cloned().ok_or_else(|| {
            StoreError::Unavailable(format!(
                "listing {} references missing owner {}",
                listing.id, listing.owner_id
            ))
        })?;

        Ok(ListingAggregate {
            listing: listing.clone(),
            owner,
            details: self.details.get(&listing.id).cloned(),
            location: self.locations.get(&listing.id).cloned(),
            counters: self.counters.get(&listing.id).copied(),
        })
    }

    fn attached_media(&self, ids: &HashSet<ListingId>) -> Vec<AttachedMedia> {
        let mut rows: Vec<AttachedMedia> = self
            .attachments
            .iter()
            .filter(|(key, _)| ids.contains(&key.0))
            .filter_map(|(key, sort_order)| {
                self.media.get(&key.1).map(|asset| AttachedMedia {
                    listing_id: key.0,
                    sort_order: *sort_order,
                    asset: asset.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.asset.created_at.cmp(&b.asset.created_at))
                .then_with(|| a.asset.id.cmp(&b.asset.id))
        });
        rows
    }

    fn require_listing(&self, id: ListingId) -> Result<(), StoreError> {
        if self.listings.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("listing {id}")))
        }
    }

    fn apply(&mut self, mutation: Mutation) -> Result<(), StoreError> {
        match mutation {
            Mutation::InsertListing {
                listing,
                details,
                location,
                counters,
            } => {
                if self.listings.contains_key(&listing.id) {
                    return Err(StoreError::Conflict(format!("listing {}", listing.id)));
                }
                if !self.users.contains_key(&listing.owner_id) {
                    return Err(StoreError::NotFound(format!("user {}", listing.owner_id)));
                }
                let id = listing.id;
                self.listings.insert(id, listing);
                self.details.insert(id, details);
                self.locations.insert(id, location);
                self.counters.insert(id, counters);
            }
            Mutation::UpdateListing {
                mut listing,
                expected_version,
            } => {
                let stored = self
                    .listings
                    .get_mut(&listing.id)
                    .ok_or_else(|| StoreError::NotFound(format!("listing {}", listing.id)))?;
                if stored.version != expected_version {
                    return Err(StoreError::VersionMismatch {
                        listing_id: listing.id,
                        expected: expected_version,
                        found: stored.version,
                    });
                }
                listing.version = expected_version + 1;
                *stored = listing;
            }
            Mutation::UpdateDetails(details) => {
                let slot = self
                    .details
                    .get_mut(&details.listing_id)
                    .ok_or_else(|| StoreError::NotFound(format!("details {}", details.listing_id)))?;
                *slot = details;
            }
            Mutation::UpdateLocation(location) => {
                let slot = self.locations.get_mut(&location.listing_id).ok_or_else(|| {
                    StoreError::NotFound(format!("location {}", location.listing_id))
                })?;
                *slot = location;
            }
            Mutation::AttachMedia { asset, attachment } => {
                self.require_listing(attachment.key.0)?;
                if self.media.contains_key(&asset.id) {
                    return Err(StoreError::Conflict(format!("media {}", asset.id)));
                }
                if self.attachments.contains_key(&attachment.key) {
                    return Err(StoreError::Conflict(format!(
                        "listing media {}/{}",
                        attachment.key.0, attachment.key.1
                    )));
                }
                self.media.insert(asset.id, asset);
                self.attachments
                    .insert(attachment.key, attachment.sort_order);
            }
            Mutation::AppendPriceChange(change) => {
                self.require_listing(change.listing_id)?;
                self.price_history.push(change);
            }
            Mutation::InsertAssociation(association) => {
                self.require_listing(association.key.listing_id())?;
                let rows = self.associations_mut(association.kind);
                if rows.contains_key(&association.key) {
                    return Err(StoreError::Conflict(format!(
                        "{} {}/{}",
                        association.kind.label(),
                        association.key.user_id(),
                        association.key.listing_id()
                    )));
                }
                rows.insert(association.key, association.created_at);
            }
            Mutation::DeleteAssociation { kind, key } => {
                if self.associations_mut(kind).remove(&key).is_none() {
                    return Err(StoreError::NotFound(format!(
                        "{} {}/{}",
                        kind.label(),
                        key.user_id(),
                        key.listing_id()
                    )));
                }
            }
            Mutation::AdjustCounter {
                listing_id,
                counter,
                delta,
            } => {
                if let Some(counters) = self.counters.get_mut(&listing_id) {
                    counters.adjust(counter, delta);
                }
            }
        }
        Ok(())
    }
}

fn compare_listings(a: &Listing, b: &Listing, page: &PageRequest) -> Ordering {
    let ordering = match page.sort {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::PublishedAt => a.published_at.cmp(&b.published_at),
        SortField::Price => a.price.cmp(&b.price),
    };
    let ordering = match page.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    };
    ordering.then_with(|| a.id.cmp(&b.id))
}

impl ListingStore for MemoryStore {
    fn user_by_subject(&self, subject: &str) -> Result<Option<User>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .subjects
            .get(subject)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut state = self.lock()?;
        if state.subjects.contains_key(&user.subject) || state.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user {}", user.subject)));
        }
        state.subjects.insert(user.subject.clone(), user.id);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn listing(&self, id: ListingId) -> Result<Option<ListingAggregate>, StoreError> {
        let state = self.lock()?;
        state
            .listings
            .get(&id)
            .map(|listing| state.aggregate(listing))
            .transpose()
    }

    fn query_listings(
        &self,
        predicate: &ListingPredicate,
        page: &PageRequest,
    ) -> Result<Page<ListingAggregate>, StoreError> {
        let state = self.lock()?;
        let mut matching = state
            .listings
            .values()
            .map(|listing| state.aggregate(listing))
            .filter(|result| match result {
                Ok(aggregate) => predicate.matches(aggregate),
                Err(_) => true,
            })
            .collect::<Result<Vec<_>, _>>()?;
        matching.sort_by(|a, b| compare_listings(&a.listing, &b.listing, page));
        Ok(Page::from_sorted(matching, page))
    }

    fn association_exists(
        &self,
        kind: AssociationKind,
        key: UserListingKey,
    ) -> Result<bool, StoreError> {
        let state = self.lock()?;
        Ok(state.associations(kind).contains_key(&key))
    }

    fn associated_listings(
        &self,
        kind: AssociationKind,
        user: UserId,
        page: &PageRequest,
    ) -> Result<Page<ListingAggregate>, StoreError> {
        let state = self.lock()?;
        let mut rows: Vec<(&UserListingKey, &DateTime<Utc>)> = state
            .associations(kind)
            .iter()
            .filter(|(key, _)| key.user_id() == user)
            .collect();
        rows.sort_by(|(a_key, a_at), (b_key, b_at)| {
            let ordering = a_at.cmp(b_at);
            let ordering = match page.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            ordering.then_with(|| a_key.cmp(b_key))
        });

        let aggregates = rows
            .into_iter()
            .filter_map(|(key, _)| state.listings.get(&key.listing_id()))
            .map(|listing| state.aggregate(listing))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::from_sorted(aggregates, page))
    }

    fn counters(&self, id: ListingId) -> Result<Option<ListingCounters>, StoreError> {
        let state = self.lock()?;
        Ok(state.counters.get(&id).copied())
    }

    fn media_for_listing(&self, id: ListingId) -> Result<Vec<AttachedMedia>, StoreError> {
        let state = self.lock()?;
        Ok(state.attached_media(&HashSet::from([id])))
    }

    fn media_for_listings(&self, ids: &[ListingId]) -> Result<Vec<AttachedMedia>, StoreError> {
        let state = self.lock()?;
        let ids: HashSet<ListingId> = ids.iter().copied().collect();
        Ok(state.attached_media(&ids))
    }

    fn price_history(&self, id: ListingId) -> Result<Vec<PriceChange>, StoreError> {
        let state = self.lock()?;
        let mut history: Vec<PriceChange> = state
            .price_history
            .iter()
            .filter(|change| change.listing_id == id)
            .cloned()
            .collect();
        history.sort_by_key(|change| change.changed_at);
        Ok(history)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let mut staged = state.clone();
        for mutation in batch.into_mutations() {
            staged.apply(mutation)?;
        }
        *state = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::domain::{
        EngagementCounter, ListingCondition, ListingStatus, PropertyType,
    };
    use rust_decimal::Decimal;

    fn owner() -> User {
        let now = Utc::now();
        User {
            id: UserId::random(),
            subject: "owner-subject".to_string(),
            name: "Rahim".to_string(),
            email: None,
            phone: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn insert_mutation(owner: UserId) -> (ListingId, Mutation) {
        let now = Utc::now();
        let id = ListingId::random();
        let mutation = Mutation::InsertListing {
            listing: Listing {
                id,
                owner_id: owner,
                property_type: PropertyType::Apartment,
                status: ListingStatus::Published,
                title: "Lake view flat".to_string(),
                description: None,
                price: Decimal::from(100_000),
                created_at: now,
                published_at: Some(now),
                updated_at: now,
                deleted_at: None,
                version: 0,
            },
            details: ListingDetails {
                listing_id: id,
                year_built: 2015,
                condition: ListingCondition::Good,
                facing_direction: None,
                bedrooms: 2,
                bathrooms: 1,
                balconies: 1,
                floor_level: Some(4),
                furnished: None,
                parking_area: None,
                pet_friendly: None,
                lot_area: None,
                living_area: 900,
            },
            location: ListingLocation {
                listing_id: id,
                address_line: "Road 7".to_string(),
                area: "Banani".to_string(),
                district: "Dhaka".to_string(),
                zip_code: "1213".to_string(),
                latitude: Decimal::new(23_7937, 4),
                longitude: Decimal::new(90_4066, 4),
            },
            counters: ListingCounters::zeroed(id),
        };
        (id, mutation)
    }

    #[test]
    fn failing_batch_leaves_no_partial_writes() {
        let store = MemoryStore::new();
        let owner = store.insert_user(owner()).expect("user inserted");
        let (id, insert) = insert_mutation(owner.id);

        let mut batch = WriteBatch::new();
        batch.push(insert).push(Mutation::DeleteAssociation {
            kind: AssociationKind::Favorite,
            key: UserListingKey(owner.id, id),
        });

        assert!(matches!(
            store.commit(batch),
            Err(StoreError::NotFound(_))
        ));
        assert!(store.listing(id).expect("read succeeds").is_none());
    }

    #[test]
    fn stale_version_is_rejected() {
        let store = MemoryStore::new();
        let owner = store.insert_user(owner()).expect("user inserted");
        let (id, insert) = insert_mutation(owner.id);
        let mut batch = WriteBatch::new();
        batch.push(insert);
        store.commit(batch).expect("insert commits");

        let listing = store
            .listing(id)
            .expect("read succeeds")
            .expect("listing present")
            .listing;

        let mut first = WriteBatch::new();
        first.push(Mutation::UpdateListing {
            listing: listing.clone(),
            expected_version: 0,
        });
        store.commit(first).expect("first update commits");

        let mut second = WriteBatch::new();
        second.push(Mutation::UpdateListing {
            listing,
            expected_version: 0,
        });
        assert!(matches!(
            store.commit(second),
            Err(StoreError::VersionMismatch { found: 1, .. })
        ));
    }

    #[test]
    fn counter_adjustments_floor_at_zero_and_tolerate_missing_rows() {
        let store = MemoryStore::new();
        let owner = store.insert_user(owner()).expect("user inserted");
        let (id, insert) = insert_mutation(owner.id);
        let mut batch = WriteBatch::new();
        batch.push(insert);
        store.commit(batch).expect("insert commits");

        let mut batch = WriteBatch::new();
        batch
            .push(Mutation::AdjustCounter {
                listing_id: id,
                counter: EngagementCounter::Saves,
                delta: -3,
            })
            .push(Mutation::AdjustCounter {
                listing_id: ListingId::random(),
                counter: EngagementCounter::Saves,
                delta: 1,
            });
        store.commit(batch).expect("adjustments commit");

        let counters = store
            .counters(id)
            .expect("read succeeds")
            .expect("counters present");
        assert_eq!(counters.save_count, 0);
    }
}
