use rust_decimal::Decimal;

use super::common::*;
use crate::catalog::domain::PropertyType;
use crate::catalog::page::{PageRequest, SortDirection, SortField};
use crate::catalog::requests::{DetailsPatch, LocationPatch, UpdateListingRequest};
use crate::catalog::search::{Satellite, SearchFilters};

#[test]
fn empty_filters_still_apply_the_published_baseline() {
    let predicate = SearchFilters::default().to_predicate();
    assert_eq!(predicate.names(), vec!["status", "not_deleted"]);
    assert!(predicate.joins().is_empty());
}

#[test]
fn each_supplied_filter_adds_one_named_criterion() {
    let filters = SearchFilters {
        property_type: Some(PropertyType::House),
        price_min: Some(Decimal::from(100)),
        price_max: None,
        district: Some("Chattogram".to_string()),
        min_bedrooms: Some(2),
    };
    let predicate = filters.to_predicate();

    assert_eq!(
        predicate.names(),
        vec![
            "status",
            "not_deleted",
            "property_type",
            "price_min",
            "district",
            "min_bedrooms"
        ]
    );
    assert_eq!(
        predicate.joins().into_iter().collect::<Vec<_>>(),
        vec![Satellite::Details, Satellite::Location]
    );
}

#[tokio::test]
async fn search_returns_only_published_live_listings() {
    let h = harness();
    register(&h.store, "owner");
    h.create("owner", 100_000, false);
    let published = h.create("owner", 200_000, true);
    let archived = h.create("owner", 300_000, true);
    h.state
        .listings
        .delete(&identity("owner"), archived)
        .expect("archive");

    let results = h
        .state
        .listings
        .search(&SearchFilters::default(), &PageRequest::default())
        .await
        .expect("search");

    let ids: Vec<_> = results.items.iter().map(|v| v.listing_id).collect();
    assert_eq!(ids, vec![published]);
    assert_eq!(results.total_items, 1);
}

#[tokio::test]
async fn price_range_bounds_are_inclusive() {
    let h = harness();
    register(&h.store, "owner");
    for price in [99_999, 100_000, 150_000, 200_000, 200_001] {
        h.create("owner", price, true);
    }

    let results = h
        .state
        .listings
        .search(
            &SearchFilters {
                price_min: Some(Decimal::from(100_000)),
                price_max: Some(Decimal::from(200_000)),
                ..SearchFilters::default()
            },
            &PageRequest::default().sorted(SortField::Price, SortDirection::Asc),
        )
        .await
        .expect("search");

    let prices: Vec<Decimal> = results.items.iter().map(|v| v.price).collect();
    assert_eq!(
        prices,
        vec![
            Decimal::from(100_000),
            Decimal::from(150_000),
            Decimal::from(200_000)
        ]
    );
}

#[tokio::test]
async fn satellite_filters_match_district_and_bedrooms() {
    let h = harness();
    register(&h.store, "owner");
    h.create("owner", 100_000, true);
    let target = h.create("owner", 120_000, true);
    h.state
        .listings
        .update(
            &identity("owner"),
            target,
            UpdateListingRequest {
                details: Some(DetailsPatch {
                    bedrooms: Some(5),
                    ..DetailsPatch::default()
                }),
                location: Some(LocationPatch {
                    district: Some("Sylhet".to_string()),
                    ..LocationPatch::default()
                }),
                ..UpdateListingRequest::default()
            },
        )
        .await
        .expect("update");

    let results = h
        .state
        .listings
        .search(
            &SearchFilters {
                district: Some("Sylhet".to_string()),
                min_bedrooms: Some(4),
                ..SearchFilters::default()
            },
            &PageRequest::default(),
        )
        .await
        .expect("search");

    let ids: Vec<_> = results.items.iter().map(|v| v.listing_id).collect();
    assert_eq!(ids, vec![target]);
}

#[tokio::test]
async fn pages_report_totals_and_slice_results() {
    let h = harness();
    register(&h.store, "owner");
    for price in [1, 2, 3] {
        h.create("owner", price, true);
    }

    let second = h
        .state
        .listings
        .search(
            &SearchFilters::default(),
            &PageRequest::new(1, 2).sorted(SortField::Price, SortDirection::Asc),
        )
        .await
        .expect("search");

    assert_eq!(second.total_items, 3);
    assert_eq!(second.total_pages, 2);
    assert_eq!(second.page, 1);
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].price, Decimal::from(3));
}
