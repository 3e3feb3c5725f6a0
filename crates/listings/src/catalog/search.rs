//! Storage-independent search predicates.
//!
//! A [`ListingPredicate`] is an ordered list of named [`Criterion`] values joined with AND. Stores
//! translate the criteria into their own query language; the in-memory store evaluates them with
//! [`ListingPredicate::matches`].

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{ListingAggregate, ListingStatus, PropertyType, UserId};

/// Optional public search parameters, independently combinable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub price_min: Option<Decimal>,
    #[serde(default)]
    pub price_max: Option<Decimal>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub min_bedrooms: Option<u16>,
}

impl SearchFilters {
    /// Published, non-deleted baseline plus one criterion per supplied filter.
    pub fn to_predicate(&self) -> ListingPredicate {
        ListingPredicate::builder()
            .and(Criterion::StatusIs(ListingStatus::Published))
            .and(Criterion::NotDeleted)
            .and_some(self.property_type, Criterion::PropertyTypeIs)
            .and_some(self.price_min, Criterion::PriceAtLeast)
            .and_some(self.price_max, Criterion::PriceAtMost)
            .and_some(self.district.clone(), Criterion::DistrictIs)
            .and_some(self.min_bedrooms, Criterion::BedroomsAtLeast)
            .build()
    }
}

/// Satellite table a criterion needs joined in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Satellite {
    Details,
    Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    StatusIs(ListingStatus),
    NotDeleted,
    OwnedBy(UserId),
    PropertyTypeIs(PropertyType),
    PriceAtLeast(Decimal),
    PriceAtMost(Decimal),
    DistrictIs(String),
    BedroomsAtLeast(u16),
}

impl Criterion {
    pub fn name(&self) -> &'static str {
        match self {
            Criterion::StatusIs(_) => "status",
            Criterion::NotDeleted => "not_deleted",
            Criterion::OwnedBy(_) => "owner",
            Criterion::PropertyTypeIs(_) => "property_type",
            Criterion::PriceAtLeast(_) => "price_min",
            Criterion::PriceAtMost(_) => "price_max",
            Criterion::DistrictIs(_) => "district",
            Criterion::BedroomsAtLeast(_) => "min_bedrooms",
        }
    }

    pub fn join(&self) -> Option<Satellite> {
        match self {
            Criterion::DistrictIs(_) => Some(Satellite::Location),
            Criterion::BedroomsAtLeast(_) => Some(Satellite::Details),
            _ => None,
        }
    }

    /// Satellite criteria behave like inner joins: a missing satellite never matches.
    pub fn matches(&self, aggregate: &ListingAggregate) -> bool {
        let listing = &aggregate.listing;
        match self {
            Criterion::StatusIs(status) => listing.status == *status,
            Criterion::NotDeleted => listing.deleted_at.is_none(),
            Criterion::OwnedBy(owner) => listing.owner_id == *owner,
            Criterion::PropertyTypeIs(kind) => listing.property_type == *kind,
            Criterion::PriceAtLeast(min) => listing.price >= *min,
            Criterion::PriceAtMost(max) => listing.price <= *max,
            Criterion::DistrictIs(district) => aggregate
                .location
                .as_ref()
                .is_some_and(|location| location.district == *district),
            Criterion::BedroomsAtLeast(min) => aggregate
                .details
                .as_ref()
                .is_some_and(|details| details.bedrooms >= *min),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPredicate {
    criteria: Vec<Criterion>,
}

impl ListingPredicate {
    pub fn builder() -> PredicateBuilder {
        PredicateBuilder::default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.criteria.iter().map(Criterion::name).collect()
    }

    pub fn joins(&self) -> BTreeSet<Satellite> {
        self.criteria.iter().filter_map(Criterion::join).collect()
    }

    pub fn matches(&self, aggregate: &ListingAggregate) -> bool {
        self.criteria
            .iter()
            .all(|criterion| criterion.matches(aggregate))
    }
}

#[derive(Debug, Default)]
pub struct PredicateBuilder {
    criteria: Vec<Criterion>,
}

impl PredicateBuilder {
    pub fn and(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn and_some<T>(self, value: Option<T>, criterion: impl FnOnce(T) -> Criterion) -> Self {
        match value {
            Some(value) => self.and(criterion(value)),
            None => self,
        }
    }

    pub fn build(self) -> ListingPredicate {
        ListingPredicate {
            criteria: self.criteria,
        }
    }
}
