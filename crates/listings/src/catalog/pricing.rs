use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::domain::{Listing, PriceChange, PriceChangeId};

/// Captures a price change before the listing's price is overwritten.
///
/// Returns the history record to persist alongside the listing update when `requested` differs
/// from the current price; the listing's price is updated in place. Returns `None` and leaves
/// the listing untouched when no price was requested or it is unchanged.
pub fn record_if_changed(
    listing: &mut Listing,
    requested: Option<Decimal>,
    now: DateTime<Utc>,
) -> Option<PriceChange> {
    let new_price = requested?;
    if new_price == listing.price {
        return None;
    }

    let change = PriceChange {
        id: PriceChangeId::random(),
        listing_id: listing.id,
        old_price: listing.price,
        new_price,
        changed_at: now,
    };
    listing.price = new_price;
    Some(change)
}
