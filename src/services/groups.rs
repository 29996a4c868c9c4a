//! User groups: membership management and item sharing

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        group::{
            check_member_removal, check_role_change, AddMember, CreateGroup, GroupDetails, GroupMember, GroupRole,
            MyGroup, UpdateGroup, UserGroup,
        },
        item::ItemShort,
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct GroupsService {
    repository: Repository,
}

impl GroupsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Caller's role in the group. Non-members get a 403.
    async fn role_of(&self, claims: &UserClaims, group_id: i32) -> AppResult<GroupRole> {
        self.repository.groups.get_by_id(group_id).await?;
        self.repository
            .groups
            .member_role(group_id, claims.user_id)
            .await?
            .ok_or_else(|| AppError::Authorization("You are not a member of this group".to_string()))
    }

    pub async fn create(&self, claims: &UserClaims, request: CreateGroup) -> AppResult<UserGroup> {
        request.validate()?;
        let group = self.repository.groups.create(claims.user_id, &request).await?;
        tracing::info!(user_id = claims.user_id, group_id = group.id, "Group created");
        Ok(group)
    }

    pub async fn list_mine(&self, claims: &UserClaims) -> AppResult<Vec<MyGroup>> {
        self.repository.groups.list_for_user(claims.user_id).await
    }

    pub async fn get(&self, claims: &UserClaims, id: i32) -> AppResult<GroupDetails> {
        if !claims.is_admin() {
            self.role_of(claims, id).await?;
        }
        let group = self.repository.groups.get_by_id(id).await?;
        let members = self.repository.groups.members(id).await?;
        let items = self.repository.groups.items(id).await?;
        Ok(GroupDetails { group, members, items })
    }

    pub async fn update(&self, claims: &UserClaims, id: i32, request: UpdateGroup) -> AppResult<UserGroup> {
        request.validate()?;
        self.role_of(claims, id).await?.require_manage_members()?;
        self.repository.groups.update(id, &request).await
    }

    /// Only the founder (or an application administrator) may delete a group
    pub async fn delete(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        if !claims.is_admin() {
            self.role_of(claims, id).await?.require_founder()?;
        }
        self.repository.groups.delete(id).await?;
        tracing::info!(user_id = claims.user_id, group_id = id, "Group deleted");
        Ok(())
    }

    pub async fn members(&self, claims: &UserClaims, id: i32) -> AppResult<Vec<GroupMember>> {
        self.role_of(claims, id).await?;
        self.repository.groups.members(id).await
    }

    /// Add a user, found by id or by username/email
    pub async fn add_member(&self, claims: &UserClaims, id: i32, request: AddMember) -> AppResult<Vec<GroupMember>> {
        let actor_role = self.role_of(claims, id).await?;
        actor_role.require_manage_members()?;

        let role = request.role.unwrap_or(GroupRole::Member);
        if role.is_founder() {
            return Err(AppError::BusinessRule("A group has exactly one founder".to_string()));
        }
        if role == GroupRole::Administrator && !actor_role.is_founder() {
            return Err(AppError::Authorization(
                "Only the founder can appoint administrators".to_string(),
            ));
        }

        let user_id = match (request.user_id, request.username.as_deref()) {
            (Some(user_id), _) => self.repository.users.get_by_id(user_id).await?.id,
            (None, Some(login)) => {
                self.repository
                    .users
                    .get_by_login(login.trim())
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", login)))?
                    .id
            }
            (None, None) => {
                return Err(AppError::Validation("Either user_id or username is required".to_string()))
            }
        };

        self.repository.groups.add_member(id, user_id, role).await?;
        tracing::info!(actor_id = claims.user_id, group_id = id, user_id, role = role.as_str(), "Member added");
        self.repository.groups.members(id).await
    }

    /// Change a member's role (founder only)
    pub async fn set_member_role(
        &self,
        claims: &UserClaims,
        id: i32,
        user_id: i32,
        role: GroupRole,
    ) -> AppResult<Vec<GroupMember>> {
        let actor_role = self.role_of(claims, id).await?;
        let target_role = self
            .repository
            .groups
            .member_role(id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} is not a member of group {}", user_id, id)))?;

        check_role_change(actor_role, target_role, role)?;
        self.repository.groups.set_member_role(id, user_id, role).await?;
        self.repository.groups.members(id).await
    }

    /// Remove a member, or leave when `user_id` is the caller
    pub async fn remove_member(&self, claims: &UserClaims, id: i32, user_id: i32) -> AppResult<()> {
        let actor_role = self.role_of(claims, id).await?;
        let target_role = self
            .repository
            .groups
            .member_role(id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} is not a member of group {}", user_id, id)))?;

        check_member_removal(claims.user_id, actor_role, user_id, target_role)?;
        self.repository.groups.remove_member(id, user_id).await?;
        tracing::info!(actor_id = claims.user_id, group_id = id, user_id, "Member removed");
        Ok(())
    }

    /// Share one of the caller's own items with a group they belong to
    pub async fn share_item(&self, claims: &UserClaims, id: i32, item_id: i32) -> AppResult<Vec<ItemShort>> {
        self.role_of(claims, id).await?;
        let item = self.repository.items.get_by_id(item_id).await?;
        if item.user_id != claims.user_id {
            return Err(AppError::Authorization("You can only share your own items".to_string()));
        }

        self.repository.groups.share_item(id, item_id, claims.user_id).await?;
        tracing::info!(user_id = claims.user_id, group_id = id, item_id, "Item shared");
        self.repository.groups.items(id).await
    }

    /// Unshare an item. Allowed for its owner and for group administrators.
    pub async fn unshare_item(&self, claims: &UserClaims, id: i32, item_id: i32) -> AppResult<()> {
        let role = self.role_of(claims, id).await?;
        let item = self.repository.items.get_by_id(item_id).await?;
        if item.user_id != claims.user_id {
            role.require_manage_members()?;
        }

        self.repository.groups.unshare_item(id, item_id).await?;
        tracing::info!(user_id = claims.user_id, group_id = id, item_id, "Item unshared");
        Ok(())
    }

    pub async fn items(&self, claims: &UserClaims, id: i32) -> AppResult<Vec<ItemShort>> {
        self.role_of(claims, id).await?;
        self.repository.groups.items(id).await
    }
}
