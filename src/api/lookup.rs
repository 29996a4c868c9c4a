//! External catalog lookups used to pre-fill new items

use axum::{
    extract::{Query, State},
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::lookup::{AlbumLookupQuery, BarcodeLookupQuery, BookLookupQuery, ExternalSearchResult, VisionLookupRequest},
    AppState,
};

use super::AuthenticatedUser;

/// Books by ISBN or free text (Google Books)
#[utoipa::path(
    get,
    path = "/lookup/book",
    tag = "lookup",
    security(("bearer_auth" = [])),
    params(BookLookupQuery),
    responses(
        (status = 200, description = "Candidates", body = Vec<ExternalSearchResult>),
        (status = 400, description = "Neither isbn nor q given"),
        (status = 502, description = "Upstream error")
    )
)]
pub async fn lookup_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<BookLookupQuery>,
) -> AppResult<Json<Vec<ExternalSearchResult>>> {
    let results = state
        .services
        .lookup
        .books(query.isbn.as_deref(), query.q.as_deref())
        .await?;
    Ok(Json(results))
}

/// Music releases by text or barcode (Discogs)
#[utoipa::path(
    get,
    path = "/lookup/album",
    tag = "lookup",
    security(("bearer_auth" = [])),
    params(AlbumLookupQuery),
    responses(
        (status = 200, description = "Candidates", body = Vec<ExternalSearchResult>),
        (status = 400, description = "Neither q nor barcode given"),
        (status = 502, description = "Upstream error"),
        (status = 503, description = "Lookup not configured")
    )
)]
pub async fn lookup_album(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<AlbumLookupQuery>,
) -> AppResult<Json<Vec<ExternalSearchResult>>> {
    let results = state
        .services
        .lookup
        .albums(query.q.as_deref(), query.barcode.as_deref())
        .await?;
    Ok(Json(results))
}

/// Generic products by UPC/EAN code
#[utoipa::path(
    get,
    path = "/lookup/barcode",
    tag = "lookup",
    security(("bearer_auth" = [])),
    params(BarcodeLookupQuery),
    responses(
        (status = 200, description = "Candidates", body = Vec<ExternalSearchResult>),
        (status = 400, description = "Malformed code"),
        (status = 502, description = "Upstream error")
    )
)]
pub async fn lookup_barcode(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<BarcodeLookupQuery>,
) -> AppResult<Json<Vec<ExternalSearchResult>>> {
    let results = state.services.lookup.barcode(&query.code).await?;
    Ok(Json(results))
}

/// Guess what an image shows (Google Cloud Vision)
#[utoipa::path(
    post,
    path = "/lookup/vision",
    tag = "lookup",
    security(("bearer_auth" = [])),
    request_body = VisionLookupRequest,
    responses(
        (status = 200, description = "Candidates", body = Vec<ExternalSearchResult>),
        (status = 400, description = "Missing image data"),
        (status = 502, description = "Upstream error"),
        (status = 503, description = "Lookup not configured")
    )
)]
pub async fn lookup_vision(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(request): Json<VisionLookupRequest>,
) -> AppResult<Json<Vec<ExternalSearchResult>>> {
    request.validate()?;

    let results = state.services.lookup.vision(&request.data).await?;
    Ok(Json(results))
}
