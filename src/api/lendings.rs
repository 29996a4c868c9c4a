//! Lending endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::lending::{CreateLending, LendingDetails, LendingQuery, UpdateLending},
    AppState,
};

use super::AuthenticatedUser;

/// Lend items to a registered user or a named outsider
#[utoipa::path(
    post,
    path = "/lendings",
    tag = "lendings",
    security(("bearer_auth" = [])),
    request_body = CreateLending,
    responses(
        (status = 201, description = "Lending created", body = LendingDetails),
        (status = 400, description = "Invalid borrower, due date or items"),
        (status = 403, description = "Item belongs to another user"),
        (status = 422, description = "Not enough quantity on hand")
    )
)]
pub async fn create_lending(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLending>,
) -> AppResult<(StatusCode, Json<LendingDetails>)> {
    let lending = state.services.lendings.create(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(lending)))
}

/// Lendings where the caller is the lender
#[utoipa::path(
    get,
    path = "/lendings/lent",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(LendingQuery),
    responses(
        (status = 200, description = "Lendings", body = Vec<LendingDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_lent(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LendingQuery>,
) -> AppResult<Json<Vec<LendingDetails>>> {
    let lendings = state.services.lendings.list_lent(&claims, &query).await?;
    Ok(Json(lendings))
}

/// Lendings where the caller is the borrower
#[utoipa::path(
    get,
    path = "/lendings/borrowed",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(LendingQuery),
    responses(
        (status = 200, description = "Lendings", body = Vec<LendingDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_borrowed(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LendingQuery>,
) -> AppResult<Json<Vec<LendingDetails>>> {
    let lendings = state.services.lendings.list_borrowed(&claims, &query).await?;
    Ok(Json(lendings))
}

#[utoipa::path(
    get,
    path = "/lendings/{id}",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Lending ID")
    ),
    responses(
        (status = 200, description = "Lending details", body = LendingDetails),
        (status = 403, description = "Not a party to the lending"),
        (status = 404, description = "Lending not found")
    )
)]
pub async fn get_lending(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LendingDetails>> {
    let lending = state.services.lendings.get(&claims, id).await?;
    Ok(Json(lending))
}

/// Change the due date or note of an open lending
#[utoipa::path(
    put,
    path = "/lendings/{id}",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Lending ID")
    ),
    request_body = UpdateLending,
    responses(
        (status = 200, description = "Lending updated", body = LendingDetails),
        (status = 403, description = "Not the lender"),
        (status = 409, description = "Lending already returned")
    )
)]
pub async fn update_lending(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateLending>,
) -> AppResult<Json<LendingDetails>> {
    let lending = state.services.lendings.update(&claims, id, request).await?;
    Ok(Json(lending))
}

/// Delete a lending. Quantities come back if it was still open.
#[utoipa::path(
    delete,
    path = "/lendings/{id}",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Lending ID")
    ),
    responses(
        (status = 204, description = "Lending deleted"),
        (status = 403, description = "Not the lender"),
        (status = 404, description = "Lending not found")
    )
)]
pub async fn delete_lending(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.lendings.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark a lending as returned
#[utoipa::path(
    post,
    path = "/lendings/{id}/end",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Lending ID")
    ),
    responses(
        (status = 200, description = "Lending returned", body = LendingDetails),
        (status = 403, description = "Not the lender"),
        (status = 409, description = "Lending already returned")
    )
)]
pub async fn end_lending(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LendingDetails>> {
    let lending = state.services.lendings.end(&claims, id).await?;
    Ok(Json(lending))
}
