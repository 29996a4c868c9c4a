//! User directory and administration endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::user::{PageQuery, UpdateRole, User, UserList, UserQuery, UserShortList},
    AppState,
};

use super::AuthenticatedUser;

/// List all users (admin)
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "List of users", body = UserList),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Administrators only")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<UserList>> {
    claims.require_admin()?;

    let (users, total) = state.services.users.list_users(&query).await?;

    Ok(Json(UserList {
        users,
        total,
        page: query.page(),
        per_page: query.per_page(),
    }))
}

/// Search users by name (borrower and member pickers)
#[utoipa::path(
    get,
    path = "/users/search",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "Matching users", body = UserShortList),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn search_users(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<UserShortList>> {
    let (users, total) = state.services.users.search_users(&query).await?;

    Ok(Json(UserShortList {
        users,
        total,
        page: query.page(),
        per_page: query.per_page(),
    }))
}

/// Get a user (self or admin)
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<User>> {
    if claims.user_id != id && !claims.is_admin() {
        return Err(AppError::Authorization("You can only view your own account".to_string()));
    }

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(user))
}

/// Delete a user and everything they own (admin)
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Administrators only"),
        (status = 404, description = "User not found"),
        (status = 422, description = "Cannot delete own account")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.users.delete_user(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change a user's role (admin)
#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateRole,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 403, description = "Administrators only"),
        (status = 422, description = "Cannot demote the last administrator")
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateRole>,
) -> AppResult<Json<User>> {
    claims.require_admin()?;

    let user = state.services.users.update_role(&claims, id, request.role).await?;
    Ok(Json(user))
}

/// Lift a login lockout (admin)
#[utoipa::path(
    post,
    path = "/users/{id}/unlock",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User unlocked"),
        (status = 403, description = "Administrators only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn unlock_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.users.unlock(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
