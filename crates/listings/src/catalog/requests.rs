use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{
    FacingDirection, Listing, ListingCondition, ListingCounters, ListingDetails, ListingId,
    ListingLocation, ListingMedia, ListingMediaKey, ListingStatus, MediaAsset, MediaId,
    PropertyType, UserId,
};
use super::error::ListingError;

/// Payload for creating a listing together with its satellites and media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub price: Decimal,
    pub details: DetailsInput,
    pub location: LocationInput,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    /// Publish immediately instead of saving as a draft.
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsInput {
    pub year_built: i32,
    pub condition: ListingCondition,
    #[serde(default)]
    pub facing_direction: Option<FacingDirection>,
    pub bedrooms: u16,
    pub bathrooms: u16,
    pub balconies: u16,
    #[serde(default)]
    pub floor_level: Option<i16>,
    #[serde(default)]
    pub furnished: Option<bool>,
    #[serde(default)]
    pub parking_area: Option<u32>,
    #[serde(default)]
    pub pet_friendly: Option<bool>,
    #[serde(default)]
    pub lot_area: Option<u32>,
    pub living_area: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInput {
    pub address_line: String,
    pub area: String,
    pub district: String,
    pub zip_code: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
}

/// Reference to an object already uploaded through a presigned upload URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub storage_key: String,
    pub content_type: String,
    pub sort_order: i32,
    #[serde(default)]
    pub byte_size: u64,
    #[serde(default)]
    pub caption: Option<String>,
}

/// Partial update. Omitted fields are left untouched; nullable fields accept an explicit
/// `null` to clear the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateListingRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<DetailsPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationPatch>,
    /// Appended to the listing's existing media; never replaces it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ListingCondition>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub facing_direction: Option<Option<FacingDirection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balconies: Option<u16>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub floor_level: Option<Option<i16>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub furnished: Option<Option<bool>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub parking_area: Option<Option<u32>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub pet_friendly: Option<Option<bool>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub lot_area: Option<Option<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub living_area: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Decimal>,
}

/// Distinguishes a present `null` (`Some(None)`) from an absent field (`None`, via `default`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn overwrite<T>(target: &mut T, value: &Option<T>)
where
    T: Clone,
{
    if let Some(value) = value {
        *target = value.clone();
    }
}

fn validate_price(price: Decimal) -> Result<(), ListingError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ListingError::validation("price", "must not be negative"));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), ListingError> {
    if title.trim().is_empty() {
        return Err(ListingError::validation("title", "must not be blank"));
    }
    Ok(())
}

impl MediaItem {
    pub(crate) fn validate(&self) -> Result<(), ListingError> {
        if self.storage_key.trim().is_empty() {
            return Err(ListingError::validation(
                "media.storage_key",
                "must not be blank",
            ));
        }
        self.content_type
            .parse::<mime::Mime>()
            .map_err(|err| ListingError::validation("media.content_type", err.to_string()))?;
        Ok(())
    }

    /// Builds the asset and its association to `listing_id` carrying the supplied sort order.
    pub(crate) fn attach(
        &self,
        listing_id: ListingId,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> (MediaAsset, ListingMedia) {
        let asset = MediaAsset {
            id: MediaId::random(),
            owner_id,
            storage_key: self.storage_key.clone(),
            content_type: self.content_type.clone(),
            byte_size: self.byte_size,
            caption: self.caption.clone(),
            created_at: now,
            deleted_at: None,
        };
        let attachment = ListingMedia {
            key: ListingMediaKey(listing_id, asset.id),
            sort_order: self.sort_order,
        };
        (asset, attachment)
    }
}

impl CreateListingRequest {
    pub fn validate(&self) -> Result<(), ListingError> {
        validate_title(&self.title)?;
        validate_price(self.price)?;
        self.media.iter().try_for_each(MediaItem::validate)
    }

    pub(crate) fn to_listing(&self, id: ListingId, owner_id: UserId, now: DateTime<Utc>) -> Listing {
        let mut listing = Listing {
            id,
            owner_id,
            property_type: self.property_type,
            status: ListingStatus::Draft,
            title: self.title.clone(),
            description: self.description.clone(),
            price: self.price,
            created_at: now,
            published_at: None,
            updated_at: now,
            deleted_at: None,
            version: 0,
        };
        apply_publishing(&mut listing, self.publish, now);
        listing
    }

    pub(crate) fn to_details(&self, listing_id: ListingId) -> ListingDetails {
        let input = &self.details;
        ListingDetails {
            listing_id,
            year_built: input.year_built,
            condition: input.condition,
            facing_direction: input.facing_direction,
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            balconies: input.balconies,
            floor_level: input.floor_level,
            furnished: input.furnished,
            parking_area: input.parking_area,
            pet_friendly: input.pet_friendly,
            lot_area: input.lot_area,
            living_area: input.living_area,
        }
    }

    pub(crate) fn to_location(&self, listing_id: ListingId) -> ListingLocation {
        let input = &self.location;
        ListingLocation {
            listing_id,
            address_line: input.address_line.clone(),
            area: input.area.clone(),
            district: input.district.clone(),
            zip_code: input.zip_code.clone(),
            latitude: input.latitude,
            longitude: input.longitude,
        }
    }

    pub(crate) fn to_counters(&self, listing_id: ListingId) -> ListingCounters {
        ListingCounters::zeroed(listing_id)
    }
}

/// Post-construction adjustment: published listings get their publication timestamp.
pub(crate) fn apply_publishing(listing: &mut Listing, publish: bool, now: DateTime<Utc>) {
    if publish {
        listing.transition(ListingStatus::Published, now);
    } else {
        listing.status = ListingStatus::Draft;
    }
}

impl UpdateListingRequest {
    pub fn validate(&self) -> Result<(), ListingError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if self.status == Some(ListingStatus::Archived) {
            return Err(ListingError::validation(
                "status",
                "listings are archived by deleting them",
            ));
        }
        self.media.iter().try_for_each(MediaItem::validate)
    }

    /// Merges every present field except the price, which goes through the price history
    /// tracker first.
    pub(crate) fn merge_into(&self, listing: &mut Listing, now: DateTime<Utc>) {
        overwrite(&mut listing.title, &self.title);
        overwrite(&mut listing.description, &self.description);
        overwrite(&mut listing.property_type, &self.property_type);
        if let Some(status) = self.status {
            listing.transition(status, now);
        }
        listing.updated_at = now;
    }

    pub(crate) fn details_patch(&self) -> Option<&DetailsPatch> {
        self.details.as_ref().filter(|patch| !patch.is_empty())
    }

    pub(crate) fn location_patch(&self) -> Option<&LocationPatch> {
        self.location.as_ref().filter(|patch| !patch.is_empty())
    }
}

impl DetailsPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply_to(&self, details: &mut ListingDetails) {
        overwrite(&mut details.year_built, &self.year_built);
        overwrite(&mut details.condition, &self.condition);
        overwrite(&mut details.facing_direction, &self.facing_direction);
        overwrite(&mut details.bedrooms, &self.bedrooms);
        overwrite(&mut details.bathrooms, &self.bathrooms);
        overwrite(&mut details.balconies, &self.balconies);
        overwrite(&mut details.floor_level, &self.floor_level);
        overwrite(&mut details.furnished, &self.furnished);
        overwrite(&mut details.parking_area, &self.parking_area);
        overwrite(&mut details.pet_friendly, &self.pet_friendly);
        overwrite(&mut details.lot_area, &self.lot_area);
        overwrite(&mut details.living_area, &self.living_area);
    }
}

impl LocationPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply_to(&self, location: &mut ListingLocation) {
        overwrite(&mut location.address_line, &self.address_line);
        overwrite(&mut location.area, &self.area);
        overwrite(&mut location.district, &self.district);
        overwrite(&mut location.zip_code, &self.zip_code);
        overwrite(&mut location.latitude, &self.latitude);
        overwrite(&mut location.longitude, &self.longitude);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn explicit_null_clears_while_omission_keeps() {
        let patch: UpdateListingRequest = serde_json::from_value(json!({
            "description": null,
            "details": { "floor_level": null, "bedrooms": 4 }
        }))
        .expect("patch parses");

        assert_eq!(patch.description, Some(None));
        assert!(patch.title.is_none());
        let details = patch.details.expect("details present");
        assert_eq!(details.floor_level, Some(None));
        assert_eq!(details.furnished, None);
        assert_eq!(details.bedrooms, Some(4));
    }

    #[test]
    fn empty_satellite_patches_are_ignored() {
        let patch: UpdateListingRequest = serde_json::from_value(json!({
            "details": {},
            "location": { "district": "Sylhet" }
        }))
        .expect("patch parses");

        assert!(patch.details_patch().is_none());
        assert_eq!(
            patch.location_patch().and_then(|p| p.district.as_deref()),
            Some("Sylhet")
        );
    }

    #[test]
    fn update_rejects_negative_price_and_archival() {
        let negative = UpdateListingRequest {
            price: Some(Decimal::from(-1)),
            ..UpdateListingRequest::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(ListingError::Validation { field: "price", .. })
        ));

        let archive = UpdateListingRequest {
            status: Some(ListingStatus::Archived),
            ..UpdateListingRequest::default()
        };
        assert!(matches!(
            archive.validate(),
            Err(ListingError::Validation { field: "status", .. })
        ));
    }

    #[test]
    fn media_items_require_parseable_content_type() {
        let item = MediaItem {
            storage_key: "listings/abc/front.jpg".to_string(),
            content_type: "not a mime".to_string(),
            sort_order: 0,
            byte_size: 10,
            caption: None,
        };
        assert!(matches!(
            item.validate(),
            Err(ListingError::Validation {
                field: "media.content_type",
                ..
            })
        ));
    }
}
