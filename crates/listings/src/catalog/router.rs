use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::accounts::{AccountService, RegistrationProfile};
use super::assembler::ResponseAssembler;
use super::domain::{AssociationKind, ListingId, PropertyType};
use super::engagement::EngagementManager;
use super::error::ListingError;
use super::media::{MediaBroker, UploadRequest};
use super::page::{PageQuery, SortDirection, SortField};
use super::requests::{CreateListingRequest, UpdateListingRequest};
use super::search::SearchFilters;
use super::service::ListingService;
use super::store::ListingStore;
use crate::config::PaginationConfig;
use crate::identity::{authenticate, IdentityError, IdentityVerifier, VerifiedIdentity};
use crate::storage::ObjectStorage;

/// Shared handler state: the listing components wired to one store and storage backend.
pub struct CatalogState<S> {
    pub listings: Arc<ListingService<S>>,
    pub engagement: Arc<EngagementManager<S>>,
    pub accounts: Arc<AccountService<S>>,
    pub media: Arc<MediaBroker>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub pagination: PaginationConfig,
}

impl<S> Clone for CatalogState<S> {
    fn clone(&self) -> Self {
        Self {
            listings: self.listings.clone(),
            engagement: self.engagement.clone(),
            accounts: self.accounts.clone(),
            media: self.media.clone(),
            verifier: self.verifier.clone(),
            pagination: self.pagination,
        }
    }
}

impl<S> CatalogState<S>
where
    S: ListingStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        storage: Arc<dyn ObjectStorage>,
        verifier: Arc<dyn IdentityVerifier>,
        pagination: PaginationConfig,
    ) -> Self {
        let assembler = ResponseAssembler::new(store.clone(), storage.clone());
        Self {
            listings: Arc::new(ListingService::new(store.clone(), assembler.clone())),
            engagement: Arc::new(EngagementManager::new(store.clone(), assembler)),
            accounts: Arc::new(AccountService::new(store)),
            media: Arc::new(MediaBroker::new(storage)),
            verifier,
            pagination,
        }
    }

    fn caller(&self, headers: &HeaderMap) -> Result<VerifiedIdentity, ApiError> {
        Ok(authenticate(self.verifier.as_ref(), headers)?)
    }
}

/// Router builder exposing account, listing, engagement, and media endpoints.
pub fn catalog_router<S>(state: CatalogState<S>) -> Router
where
    S: ListingStore + 'static,
{
    Router::new()
        .route("/api/v1/users/register", post(register_handler::<S>))
        .route("/api/v1/users/me", get(me_handler::<S>))
        .route(
            "/api/v1/listings",
            post(create_handler::<S>).get(search_handler::<S>),
        )
        .route("/api/v1/listings/mine", get(mine_handler::<S>))
        .route("/api/v1/listings/favorites", get(favorites_handler::<S>))
        .route("/api/v1/listings/saved", get(saved_handler::<S>))
        .route(
            "/api/v1/listings/:listing_id",
            get(get_handler::<S>)
                .patch(update_handler::<S>)
                .delete(delete_handler::<S>),
        )
        .route(
            "/api/v1/listings/:listing_id/price-history",
            get(price_history_handler::<S>),
        )
        .route(
            "/api/v1/listings/:listing_id/favorite",
            post(add_favorite_handler::<S>).delete(remove_favorite_handler::<S>),
        )
        .route(
            "/api/v1/listings/:listing_id/save",
            post(add_saved_handler::<S>).delete(remove_saved_handler::<S>),
        )
        .route("/api/v1/media/upload-request", post(upload_request_handler::<S>))
        .route("/api/v1/media/download-url", get(download_url_handler::<S>))
        .route("/api/v1/media", axum::routing::delete(delete_object_handler::<S>))
        .with_state(state)
}

/// Search parameters and pagination as one flat query string.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub property_type: Option<PropertyType>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub district: Option<String>,
    pub min_bedrooms: Option<u16>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<SortField>,
    pub direction: Option<SortDirection>,
}

impl SearchQuery {
    fn filters(&self) -> SearchFilters {
        SearchFilters {
            property_type: self.property_type,
            price_min: self.price_min,
            price_max: self.price_max,
            district: self.district.clone(),
            min_bedrooms: self.min_bedrooms,
        }
    }

    fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            size: self.size,
            sort: self.sort,
            direction: self.direction,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MineQuery {
    pub include_archived: Option<bool>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<SortField>,
    pub direction: Option<SortDirection>,
}

#[derive(Debug, Deserialize)]
pub struct ObjectKeyQuery {
    pub key: String,
}

pub(crate) async fn register_handler<S>(
    State(state): State<CatalogState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    let identity = state.caller(&headers)?;
    let profile = registration_profile(&body)?;
    let user = state.accounts.register(&identity, profile)?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

/// An empty body registers from identity claims alone; anything else must be a valid profile.
fn registration_profile(body: &[u8]) -> Result<Option<RegistrationProfile>, ListingError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|err| ListingError::validation("profile", err.to_string()))
}

pub(crate) async fn me_handler<S>(
    State(state): State<CatalogState<S>>,
    headers: HeaderMap,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    let identity = state.caller(&headers)?;
    let user = state.accounts.me(&identity)?;
    Ok(Json(user).into_response())
}

pub(crate) async fn create_handler<S>(
    State(state): State<CatalogState<S>>,
    headers: HeaderMap,
    Json(request): Json<CreateListingRequest>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    let identity = state.caller(&headers)?;
    let listing_id = state.listings.create(&identity, request)?;
    let payload = json!({
        "listing_id": listing_id,
        "message": "listing created",
    });
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

pub(crate) async fn search_handler<S>(
    State(state): State<CatalogState<S>>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    let page = query.page_query().resolve(&state.pagination);
    let results = state.listings.search(&query.filters(), &page).await?;
    Ok(Json(results).into_response())
}

pub(crate) async fn mine_handler<S>(
    State(state): State<CatalogState<S>>,
    headers: HeaderMap,
    Query(query): Query<MineQuery>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    let identity = state.caller(&headers)?;
    let page = PageQuery {
        page: query.page,
        size: query.size,
        sort: query.sort,
        direction: query.direction,
    }
    .resolve(&state.pagination);
    let results = state
        .listings
        .list_mine(&identity, query.include_archived.unwrap_or(false), &page)
        .await?;
    Ok(Json(results).into_response())
}

pub(crate) async fn favorites_handler<S>(
    state: State<CatalogState<S>>,
    headers: HeaderMap,
    query: Query<PageQuery>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    list_associations(AssociationKind::Favorite, state, headers, query).await
}

pub(crate) async fn saved_handler<S>(
    state: State<CatalogState<S>>,
    headers: HeaderMap,
    query: Query<PageQuery>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    list_associations(AssociationKind::Saved, state, headers, query).await
}

async fn list_associations<S>(
    kind: AssociationKind,
    State(state): State<CatalogState<S>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    let identity = state.caller(&headers)?;
    let page = query.resolve(&state.pagination);
    let results = state.engagement.list(kind, &identity, &page).await?;
    Ok(Json(results).into_response())
}

pub(crate) async fn get_handler<S>(
    State(state): State<CatalogState<S>>,
    Path(listing_id): Path<ListingId>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    let view = state.listings.get(listing_id).await?;
    Ok(Json(view).into_response())
}

pub(crate) async fn update_handler<S>(
    State(state): State<CatalogState<S>>,
    headers: HeaderMap,
    Path(listing_id): Path<ListingId>,
    Json(request): Json<UpdateListingRequest>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    let identity = state.caller(&headers)?;
    let view = state.listings.update(&identity, listing_id, request).await?;
    Ok(Json(view).into_response())
}

pub(crate) async fn delete_handler<S>(
    State(state): State<CatalogState<S>>,
    headers: HeaderMap,
    Path(listing_id): Path<ListingId>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    let identity = state.caller(&headers)?;
    state.listings.delete(&identity, listing_id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn price_history_handler<S>(
    State(state): State<CatalogState<S>>,
    Path(listing_id): Path<ListingId>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    let history = state.listings.price_history(listing_id)?;
    Ok(Json(history).into_response())
}

pub(crate) async fn add_favorite_handler<S>(
    state: State<CatalogState<S>>,
    headers: HeaderMap,
    path: Path<ListingId>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    add_association(AssociationKind::Favorite, state, headers, path)
}

pub(crate) async fn remove_favorite_handler<S>(
    state: State<CatalogState<S>>,
    headers: HeaderMap,
    path: Path<ListingId>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    remove_association(AssociationKind::Favorite, state, headers, path)
}

pub(crate) async fn add_saved_handler<S>(
    state: State<CatalogState<S>>,
    headers: HeaderMap,
    path: Path<ListingId>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    add_association(AssociationKind::Saved, state, headers, path)
}

pub(crate) async fn remove_saved_handler<S>(
    state: State<CatalogState<S>>,
    headers: HeaderMap,
    path: Path<ListingId>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    remove_association(AssociationKind::Saved, state, headers, path)
}

fn add_association<S>(
    kind: AssociationKind,
    State(state): State<CatalogState<S>>,
    headers: HeaderMap,
    Path(listing_id): Path<ListingId>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    let identity = state.caller(&headers)?;
    state.engagement.add(kind, &identity, listing_id)?;
    Ok(StatusCode::CREATED.into_response())
}

fn remove_association<S>(
    kind: AssociationKind,
    State(state): State<CatalogState<S>>,
    headers: HeaderMap,
    Path(listing_id): Path<ListingId>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    let identity = state.caller(&headers)?;
    state.engagement.remove(kind, &identity, listing_id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn upload_request_handler<S>(
    State(state): State<CatalogState<S>>,
    headers: HeaderMap,
    Json(request): Json<UploadRequest>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    state.caller(&headers)?;
    let ticket = state.media.request_upload(&request).await?;
    Ok(Json(ticket).into_response())
}

pub(crate) async fn download_url_handler<S>(
    State(state): State<CatalogState<S>>,
    headers: HeaderMap,
    Query(query): Query<ObjectKeyQuery>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    state.caller(&headers)?;
    let presigned = state.media.download_url(&query.key).await?;
    Ok(Json(presigned).into_response())
}

pub(crate) async fn delete_object_handler<S>(
    State(state): State<CatalogState<S>>,
    headers: HeaderMap,
    Query(query): Query<ObjectKeyQuery>,
) -> Result<Response, ApiError>
where
    S: ListingStore + 'static,
{
    state.caller(&headers)?;
    state.media.delete_object(&query.key).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Failure returned by catalog handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Listing(#[from] ListingError),
}

/// HTTP status for a domain failure. Collaborator failures surface as upstream errors.
pub fn status_for(error: &ListingError) -> StatusCode {
    match error {
        ListingError::NotFound { .. } => StatusCode::NOT_FOUND,
        ListingError::AlreadyExists(_) | ListingError::StaleWrite(_) => StatusCode::CONFLICT,
        ListingError::Unauthorized => StatusCode::FORBIDDEN,
        ListingError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ListingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ListingError::Storage(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Identity(_) => StatusCode::UNAUTHORIZED,
            ApiError::Listing(err) => status_for(err),
        };
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let payload = json!({ "error": self.to_string() });
        (status, Json(payload)).into_response()
    }
}
