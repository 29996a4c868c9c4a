//! Item endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        attribute::{ItemAttributeValue, SetItemAttributes},
        item::{CreateItem, Item, ItemDetails, ItemList, ItemQuery, SetItemLocations, UpdateItem},
    },
    AppState,
};

use super::AuthenticatedUser;

/// Search own items and items shared with the caller's groups
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    params(ItemQuery),
    responses(
        (status = 200, description = "Matching items", body = ItemList),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a member of the requested group")
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<ItemList>> {
    let items = state.services.items.search(&claims, &query).await?;
    Ok(Json(items))
}

/// Get item details
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = ItemDetails),
        (status = 403, description = "Item not visible to the caller"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ItemDetails>> {
    let item = state.services.items.get_details(&claims, id).await?;
    Ok(Json(item))
}

/// Create an item
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = ItemDetails),
        (status = 400, description = "Invalid input or a location belonging to another user")
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(item): Json<CreateItem>,
) -> AppResult<(StatusCode, Json<ItemDetails>)> {
    let created = state.services.items.create(&claims, item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an item
#[utoipa::path(
    put,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = Item),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(item): Json<UpdateItem>,
) -> AppResult<Json<Item>> {
    let updated = state.services.items.update(&claims, id, item).await?;
    Ok(Json(updated))
}

/// Delete an item with its attributes, images, shares and lending lines
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.items.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the locations an item is stored in
#[utoipa::path(
    put,
    path = "/items/{id}/locations",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = SetItemLocations,
    responses(
        (status = 200, description = "Location ids now linked to the item", body = Vec<i32>),
        (status = 400, description = "Location belongs to another user"),
        (status = 403, description = "Not the owner of the item"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn set_item_locations(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<SetItemLocations>,
) -> AppResult<Json<Vec<i32>>> {
    let location_ids = state.services.items.set_locations(&claims, id, request).await?;
    Ok(Json(location_ids))
}

/// Attribute values of an item
#[utoipa::path(
    get,
    path = "/items/{id}/attributes",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Attribute values", body = Vec<ItemAttributeValue>),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item_attributes(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<ItemAttributeValue>>> {
    let values = state.services.attributes.item_values(&claims, id).await?;
    Ok(Json(values))
}

/// Replace all attribute values of an item
#[utoipa::path(
    put,
    path = "/items/{id}/attributes",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = SetItemAttributes,
    responses(
        (status = 200, description = "Attribute values", body = Vec<ItemAttributeValue>),
        (status = 400, description = "Unknown attribute or value of the wrong type"),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn set_item_attributes(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<SetItemAttributes>,
) -> AppResult<Json<Vec<ItemAttributeValue>>> {
    let values = state.services.attributes.set_item_values(&claims, id, request).await?;
    Ok(Json(values))
}
