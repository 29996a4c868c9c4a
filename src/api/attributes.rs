//! Attribute definition endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::attribute::{Attribute, CreateAttribute},
    AppState,
};

use super::AuthenticatedUser;

/// Built-in attributes plus the caller's own
#[utoipa::path(
    get,
    path = "/attributes",
    tag = "attributes",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Visible attributes", body = Vec<Attribute>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_attributes(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Attribute>>> {
    let attributes = state.services.attributes.list(&claims).await?;
    Ok(Json(attributes))
}

/// Define a custom attribute
#[utoipa::path(
    post,
    path = "/attributes",
    tag = "attributes",
    security(("bearer_auth" = [])),
    request_body = CreateAttribute,
    responses(
        (status = 201, description = "Attribute created", body = Attribute),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "An attribute with this name already exists")
    )
)]
pub async fn create_attribute(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateAttribute>,
) -> AppResult<(StatusCode, Json<Attribute>)> {
    let attribute = state.services.attributes.create(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(attribute)))
}

/// Delete a custom attribute and every value recorded for it
#[utoipa::path(
    delete,
    path = "/attributes/{id}",
    tag = "attributes",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Attribute ID")
    ),
    responses(
        (status = 204, description = "Attribute deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Attribute not found"),
        (status = 422, description = "Built-in attributes cannot be deleted")
    )
)]
pub async fn delete_attribute(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.attributes.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
