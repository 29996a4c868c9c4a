//! Image endpoints for items and locations

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::image::{ImageData, ImageInfo, UploadImage},
    repository::images::ImageOwner,
    AppState,
};

use super::AuthenticatedUser;

fn image_response(image: ImageData) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, image.content_type)], image.data)
}

/// List images of an item
#[utoipa::path(
    get,
    path = "/items/{id}/images",
    tag = "images",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Image metadata", body = Vec<ImageInfo>),
        (status = 404, description = "Item not found")
    )
)]
pub async fn list_item_images(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<ImageInfo>>> {
    let images = state.services.images.list(&claims, ImageOwner::Item, id).await?;
    Ok(Json(images))
}

/// Upload an image for an item (base64 JSON body)
#[utoipa::path(
    post,
    path = "/items/{id}/images",
    tag = "images",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = UploadImage,
    responses(
        (status = 201, description = "Image stored", body = ImageInfo),
        (status = 400, description = "Invalid image"),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn upload_item_image(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(upload): Json<UploadImage>,
) -> AppResult<(StatusCode, Json<ImageInfo>)> {
    let info = state.services.images.upload(&claims, ImageOwner::Item, id, upload).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// Download an item image
#[utoipa::path(
    get,
    path = "/items/{id}/images/{image_id}",
    tag = "images",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image bytes", content_type = "application/octet-stream"),
        (status = 404, description = "Image not found")
    )
)]
pub async fn download_item_image(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, image_id)): Path<(i32, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let image = state
        .services
        .images
        .download(&claims, ImageOwner::Item, id, image_id)
        .await?;
    Ok(image_response(image))
}

/// Delete an item image
#[utoipa::path(
    delete,
    path = "/items/{id}/images/{image_id}",
    tag = "images",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Image not found")
    )
)]
pub async fn delete_item_image(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, image_id)): Path<(i32, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .services
        .images
        .delete(&claims, ImageOwner::Item, id, image_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List images of a location
#[utoipa::path(
    get,
    path = "/locations/{id}/images",
    tag = "images",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Location ID")
    ),
    responses(
        (status = 200, description = "Image metadata", body = Vec<ImageInfo>),
        (status = 404, description = "Location not found")
    )
)]
pub async fn list_location_images(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<ImageInfo>>> {
    let images = state.services.images.list(&claims, ImageOwner::Location, id).await?;
    Ok(Json(images))
}

/// Upload an image for a location (base64 JSON body)
#[utoipa::path(
    post,
    path = "/locations/{id}/images",
    tag = "images",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Location ID")
    ),
    request_body = UploadImage,
    responses(
        (status = 201, description = "Image stored", body = ImageInfo),
        (status = 400, description = "Invalid image"),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn upload_location_image(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(upload): Json<UploadImage>,
) -> AppResult<(StatusCode, Json<ImageInfo>)> {
    let info = state
        .services
        .images
        .upload(&claims, ImageOwner::Location, id, upload)
        .await?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// Download a location image
#[utoipa::path(
    get,
    path = "/locations/{id}/images/{image_id}",
    tag = "images",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Location ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image bytes", content_type = "application/octet-stream"),
        (status = 404, description = "Image not found")
    )
)]
pub async fn download_location_image(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, image_id)): Path<(i32, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let image = state
        .services
        .images
        .download(&claims, ImageOwner::Location, id, image_id)
        .await?;
    Ok(image_response(image))
}

/// Delete a location image
#[utoipa::path(
    delete,
    path = "/locations/{id}/images/{image_id}",
    tag = "images",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Location ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Image not found")
    )
)]
pub async fn delete_location_image(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, image_id)): Path<(i32, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .services
        .images
        .delete(&claims, ImageOwner::Location, id, image_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
