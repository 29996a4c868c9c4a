//! User group endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        group::{AddMember, CreateGroup, GroupDetails, GroupMember, MyGroup, ShareItem, UpdateGroup, UpdateMemberRole, UserGroup},
        item::ItemShort,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Groups the caller belongs to, with their role
#[utoipa::path(
    get,
    path = "/groups",
    tag = "groups",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Groups", body = Vec<MyGroup>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_groups(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<MyGroup>>> {
    let groups = state.services.groups.list_mine(&claims).await?;
    Ok(Json(groups))
}

/// Create a group; the caller becomes its founder
#[utoipa::path(
    post,
    path = "/groups",
    tag = "groups",
    security(("bearer_auth" = [])),
    request_body = CreateGroup,
    responses(
        (status = 201, description = "Group created", body = UserGroup),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_group(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateGroup>,
) -> AppResult<(StatusCode, Json<UserGroup>)> {
    let group = state.services.groups.create(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    get,
    path = "/groups/{id}",
    tag = "groups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Group ID")
    ),
    responses(
        (status = 200, description = "Group with members and shared items", body = GroupDetails),
        (status = 403, description = "Not a member"),
        (status = 404, description = "Group not found")
    )
)]
pub async fn get_group(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<GroupDetails>> {
    let group = state.services.groups.get(&claims, id).await?;
    Ok(Json(group))
}

#[utoipa::path(
    put,
    path = "/groups/{id}",
    tag = "groups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Group ID")
    ),
    request_body = UpdateGroup,
    responses(
        (status = 200, description = "Group updated", body = UserGroup),
        (status = 403, description = "Group administrators only")
    )
)]
pub async fn update_group(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateGroup>,
) -> AppResult<Json<UserGroup>> {
    let group = state.services.groups.update(&claims, id, request).await?;
    Ok(Json(group))
}

#[utoipa::path(
    delete,
    path = "/groups/{id}",
    tag = "groups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Group ID")
    ),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 403, description = "Founder only"),
        (status = 404, description = "Group not found")
    )
)]
pub async fn delete_group(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.groups.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/groups/{id}/members",
    tag = "groups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Group ID")
    ),
    responses(
        (status = 200, description = "Members", body = Vec<GroupMember>),
        (status = 403, description = "Not a member")
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<GroupMember>>> {
    let members = state.services.groups.members(&claims, id).await?;
    Ok(Json(members))
}

/// Add a member by user id or username
#[utoipa::path(
    post,
    path = "/groups/{id}/members",
    tag = "groups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Group ID")
    ),
    request_body = AddMember,
    responses(
        (status = 201, description = "Member added", body = Vec<GroupMember>),
        (status = 403, description = "Group administrators only"),
        (status = 409, description = "Already a member")
    )
)]
pub async fn add_member(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<AddMember>,
) -> AppResult<(StatusCode, Json<Vec<GroupMember>>)> {
    let members = state.services.groups.add_member(&claims, id, request).await?;
    Ok((StatusCode::CREATED, Json(members)))
}

/// Change a member's role (founder only)
#[utoipa::path(
    put,
    path = "/groups/{id}/members/{user_id}",
    tag = "groups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Group ID"),
        ("user_id" = i32, Path, description = "Member user ID")
    ),
    request_body = UpdateMemberRole,
    responses(
        (status = 200, description = "Role changed", body = Vec<GroupMember>),
        (status = 403, description = "Founder only"),
        (status = 404, description = "Not a member")
    )
)]
pub async fn update_member_role(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, user_id)): Path<(i32, i32)>,
    Json(request): Json<UpdateMemberRole>,
) -> AppResult<Json<Vec<GroupMember>>> {
    let members = state
        .services
        .groups
        .set_member_role(&claims, id, user_id, request.role)
        .await?;
    Ok(Json(members))
}

/// Remove a member. Their items are unshared from the group.
#[utoipa::path(
    delete,
    path = "/groups/{id}/members/{user_id}",
    tag = "groups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Group ID"),
        ("user_id" = i32, Path, description = "Member user ID")
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 403, description = "Not allowed to remove this member"),
        (status = 404, description = "Not a member")
    )
)]
pub async fn remove_member(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, user_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    state.services.groups.remove_member(&claims, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Leave a group. The founder cannot leave.
#[utoipa::path(
    post,
    path = "/groups/{id}/leave",
    tag = "groups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Group ID")
    ),
    responses(
        (status = 204, description = "Left the group"),
        (status = 403, description = "Not a member"),
        (status = 422, description = "The founder cannot leave")
    )
)]
pub async fn leave_group(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.groups.remove_member(&claims, id, claims.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/groups/{id}/items",
    tag = "groups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Group ID")
    ),
    responses(
        (status = 200, description = "Items shared with the group", body = Vec<ItemShort>),
        (status = 403, description = "Not a member")
    )
)]
pub async fn list_group_items(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<ItemShort>>> {
    let items = state.services.groups.items(&claims, id).await?;
    Ok(Json(items))
}

/// Share one of the caller's items with the group
#[utoipa::path(
    post,
    path = "/groups/{id}/items",
    tag = "groups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Group ID")
    ),
    request_body = ShareItem,
    responses(
        (status = 201, description = "Item shared", body = Vec<ItemShort>),
        (status = 403, description = "Not a member or not the item owner"),
        (status = 409, description = "Already shared")
    )
)]
pub async fn share_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<ShareItem>,
) -> AppResult<(StatusCode, Json<Vec<ItemShort>>)> {
    let items = state.services.groups.share_item(&claims, id, request.item_id).await?;
    Ok((StatusCode::CREATED, Json(items)))
}

/// Stop sharing an item (its owner or a group administrator)
#[utoipa::path(
    delete,
    path = "/groups/{id}/items/{item_id}",
    tag = "groups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Group ID"),
        ("item_id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item unshared"),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Item not shared with the group")
    )
)]
pub async fn unshare_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, item_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    state.services.groups.unshare_item(&claims, id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
