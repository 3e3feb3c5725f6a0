use crate::infra::LocalObjectStorage;
use clap::Args;
use listings::catalog::{
    AccountService, AssociationKind, CreateListingRequest, DetailsInput, EngagementManager,
    ListingCondition, ListingService, ListingView, LocationInput, MediaItem, MemoryStore,
    PageRequest, PropertyType, ResponseAssembler, SearchFilters, UpdateListingRequest,
};
use listings::config::StorageConfig;
use listings::error::AppError;
use listings::identity::VerifiedIdentity;
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// District searched for during the walkthrough
    #[arg(long, default_value = "Gulshan")]
    pub(crate) district: String,
    /// Minimum number of bedrooms searched for
    #[arg(long, default_value_t = 2)]
    pub(crate) min_bedrooms: u16,
    /// New asking price applied to the first listing
    #[arg(long, default_value = "415000")]
    pub(crate) new_price: Decimal,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = Arc::new(MemoryStore::new());
    let storage = Arc::new(LocalObjectStorage::from_config(&StorageConfig::default()));
    let assembler = ResponseAssembler::new(store.clone(), storage);
    let listings = ListingService::new(store.clone(), assembler.clone());
    let engagement = EngagementManager::new(store.clone(), assembler);
    let accounts = AccountService::new(store);

    let owner = identity("demo|owner", "Nadia Rahman");
    let fan = identity("demo|fan", "Imran Hossain");
    accounts.register(&owner, None)?;
    accounts.register(&fan, None)?;

    println!("Listing marketplace demo");
    let seeded = [
        ("Lakeside apartment", "Gulshan", 3, Decimal::new(450_000, 0), true),
        ("Corner duplex", "Banani", 4, Decimal::new(780_000, 0), true),
        ("Studio near the park", "Gulshan", 1, Decimal::new(120_000, 0), true),
        ("Unfinished plot", "Gulshan", 0, Decimal::new(90_000, 0), false),
    ];
    let mut ids = Vec::with_capacity(seeded.len());
    for (title, district, bedrooms, price, publish) in seeded {
        let id = listings.create(&owner, listing(title, district, bedrooms, price, publish))?;
        println!(
            "- Created {} ({}) -> {}",
            title,
            if publish { "published" } else { "draft" },
            id
        );
        ids.push(id);
    }

    let filters = SearchFilters {
        district: Some(args.district.clone()),
        min_bedrooms: Some(args.min_bedrooms),
        ..SearchFilters::default()
    };
    let results = listings.search(&filters, &PageRequest::default()).await?;
    println!(
        "\nSearch: district {} with at least {} bedrooms -> {} match(es)",
        args.district, args.min_bedrooms, results.total_items
    );
    for view in &results.items {
        render(view);
    }

    let Some(&first) = ids.first() else {
        return Ok(());
    };

    engagement.add(AssociationKind::Favorite, &fan, first)?;
    engagement.add(AssociationKind::Saved, &fan, first)?;
    let favorites = engagement
        .list(AssociationKind::Favorite, &fan, &PageRequest::default())
        .await?;
    println!("\nFavorites for {}: {}", fan.subject, favorites.total_items);

    let update = UpdateListingRequest {
        price: Some(args.new_price),
        ..UpdateListingRequest::default()
    };
    let updated = listings.update(&owner, first, update).await?;
    println!("\nAfter price change:");
    render(&updated);
    for change in listings.price_history(first)? {
        println!(
            "  price history: {} -> {} at {}",
            change.old_price,
            change.new_price,
            change.changed_at.to_rfc3339()
        );
    }

    Ok(())
}

fn identity(subject: &str, name: &str) -> VerifiedIdentity {
    VerifiedIdentity {
        subject: subject.to_string(),
        name: Some(name.to_string()),
        email: None,
        phone: None,
        picture: None,
    }
}

fn listing(
    title: &str,
    district: &str,
    bedrooms: u16,
    price: Decimal,
    publish: bool,
) -> CreateListingRequest {
    let property_type = if bedrooms == 0 {
        PropertyType::Plot
    } else {
        PropertyType::Apartment
    };
    CreateListingRequest {
        title: title.to_string(),
        description: None,
        property_type,
        price,
        details: DetailsInput {
            year_built: 2018,
            condition: ListingCondition::Good,
            facing_direction: None,
            bedrooms,
            bathrooms: bedrooms.max(1),
            balconies: 1,
            floor_level: None,
            furnished: None,
            parking_area: None,
            pet_friendly: None,
            lot_area: None,
            living_area: 650 + u32::from(bedrooms) * 300,
        },
        location: LocationInput {
            address_line: format!("{} Road 11", district),
            area: district.to_string(),
            district: district.to_string(),
            zip_code: "1212".to_string(),
            latitude: Decimal::new(237_925, 4),
            longitude: Decimal::new(904_078, 4),
        },
        media: vec![MediaItem {
            storage_key: format!("listings/demo/{}.jpg", title.to_lowercase().replace(' ', "-")),
            content_type: "image/jpeg".to_string(),
            sort_order: 0,
            byte_size: 0,
            caption: None,
        }],
        publish,
    }
}

fn render(view: &ListingView) {
    let counters = view
        .counters
        .map(|c| format!("{} favorites / {} saves", c.favorite_count, c.save_count))
        .unwrap_or_else(|| "no counters".to_string());
    println!(
        "  - {} | {} | {} | {}",
        view.title,
        view.price,
        view.status.label(),
        counters
    );
    for media in &view.media {
        println!("    media: {}", media.url);
    }
}
