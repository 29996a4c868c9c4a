//! Storage location endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::location::{CreateLocation, Location, LocationDetails, LocationNode, UpdateLocation},
    AppState,
};

use super::AuthenticatedUser;

/// Caller's locations, flat
#[utoipa::path(
    get,
    path = "/locations",
    tag = "locations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Locations", body = Vec<Location>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_locations(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Location>>> {
    let locations = state.services.locations.list(&claims).await?;
    Ok(Json(locations))
}

/// Caller's locations as a hierarchy
#[utoipa::path(
    get,
    path = "/locations/tree",
    tag = "locations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Root locations with nested children", body = Vec<LocationNode>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn location_tree(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LocationNode>>> {
    let tree = state.services.locations.tree(&claims).await?;
    Ok(Json(tree))
}

/// Location with children, stored items and images
#[utoipa::path(
    get,
    path = "/locations/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Location ID")
    ),
    responses(
        (status = 200, description = "Location details", body = LocationDetails),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Location not found")
    )
)]
pub async fn get_location(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LocationDetails>> {
    let location = state.services.locations.get_details(&claims, id).await?;
    Ok(Json(location))
}

#[utoipa::path(
    post,
    path = "/locations",
    tag = "locations",
    security(("bearer_auth" = [])),
    request_body = CreateLocation,
    responses(
        (status = 201, description = "Location created", body = Location),
        (status = 400, description = "Invalid input or unknown parent")
    )
)]
pub async fn create_location(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLocation>,
) -> AppResult<(StatusCode, Json<Location>)> {
    let location = state.services.locations.create(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// Rename, describe or move a location
#[utoipa::path(
    put,
    path = "/locations/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Location ID")
    ),
    request_body = UpdateLocation,
    responses(
        (status = 200, description = "Location updated", body = Location),
        (status = 400, description = "Move would create a cycle"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Location not found")
    )
)]
pub async fn update_location(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateLocation>,
) -> AppResult<Json<Location>> {
    let location = state.services.locations.update(&claims, id, request).await?;
    Ok(Json(location))
}

/// Delete a location. Children move up to its parent.
#[utoipa::path(
    delete,
    path = "/locations/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Location ID")
    ),
    responses(
        (status = 204, description = "Location deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Location not found")
    )
)]
pub async fn delete_location(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.locations.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
