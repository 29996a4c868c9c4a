//! User groups, memberships and shared items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use super::item::ItemShort;
use crate::error::{AppError, AppResult};

/// Role of a member inside a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Member,
    Administrator,
    Founder,
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Member => "member",
            GroupRole::Administrator => "administrator",
            GroupRole::Founder => "founder",
        }
    }

    /// Add or remove members, unshare any item
    pub fn can_manage_members(&self) -> bool {
        *self >= GroupRole::Administrator
    }

    /// Rename, change roles, delete the group
    pub fn is_founder(&self) -> bool {
        *self == GroupRole::Founder
    }

    pub fn require_manage_members(&self) -> AppResult<()> {
        if self.can_manage_members() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Group administrator role required".to_string(),
            ))
        }
    }

    pub fn require_founder(&self) -> AppResult<()> {
        if self.is_founder() {
            Ok(())
        } else {
            Err(AppError::Authorization("Group founder role required".to_string()))
        }
    }
}

impl std::str::FromStr for GroupRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(GroupRole::Member),
            "administrator" => Ok(GroupRole::Administrator),
            "founder" => Ok(GroupRole::Founder),
            _ => Err(format!("Invalid group role: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for GroupRole {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for GroupRole {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for GroupRole {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Group row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserGroup {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Group as seen by one of its members
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MyGroup {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub role: GroupRole,
    pub member_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct GroupMember {
    pub user_id: i32,
    pub username: String,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupDetails {
    #[serde(flatten)]
    pub group: UserGroup,
    pub members: Vec<GroupMember>,
    pub items: Vec<ItemShort>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGroup {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateGroup {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Add a member, by id or by username/email
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMember {
    pub user_id: Option<i32>,
    pub username: Option<String>,
    pub role: Option<GroupRole>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMemberRole {
    pub role: GroupRole,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShareItem {
    pub item_id: i32,
}

/// Decide whether `actor` may remove `target` from a group
pub fn check_member_removal(
    actor_id: i32,
    actor_role: GroupRole,
    target_id: i32,
    target_role: GroupRole,
) -> AppResult<()> {
    if target_role.is_founder() {
        return Err(AppError::BusinessRule(
            "The founder cannot leave or be removed from the group".to_string(),
        ));
    }
    if actor_id == target_id {
        return Ok(());
    }
    actor_role.require_manage_members()?;
    if target_role == GroupRole::Administrator && !actor_role.is_founder() {
        return Err(AppError::Authorization(
            "Only the founder can remove an administrator".to_string(),
        ));
    }
    Ok(())
}

/// Decide whether `actor` may assign `new_role` to a member currently holding `target_role`
pub fn check_role_change(actor_role: GroupRole, target_role: GroupRole, new_role: GroupRole) -> AppResult<()> {
    actor_role.require_founder()?;
    if target_role.is_founder() || new_role.is_founder() {
        return Err(AppError::BusinessRule(
            "The founder role cannot be transferred or revoked".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use GroupRole::*;

    #[test]
    fn test_role_ordering() {
        assert!(Founder.can_manage_members());
        assert!(Administrator.can_manage_members());
        assert!(!Member.can_manage_members());
        assert!(Founder.require_founder().is_ok());
        assert!(Administrator.require_founder().is_err());
    }

    #[test]
    fn test_member_can_leave() {
        assert!(check_member_removal(5, Member, 5, Member).is_ok());
        assert!(check_member_removal(5, Administrator, 5, Administrator).is_ok());
    }

    #[test]
    fn test_founder_is_permanent() {
        assert!(matches!(
            check_member_removal(1, Founder, 1, Founder),
            Err(AppError::BusinessRule(_))
        ));
        assert!(check_member_removal(2, Administrator, 1, Founder).is_err());
    }

    #[test]
    fn test_member_removal_permissions() {
        assert!(check_member_removal(2, Member, 3, Member).is_err());
        assert!(check_member_removal(2, Administrator, 3, Member).is_ok());
        assert!(check_member_removal(2, Administrator, 3, Administrator).is_err());
        assert!(check_member_removal(1, Founder, 3, Administrator).is_ok());
    }

    #[test]
    fn test_role_changes() {
        assert!(check_role_change(Founder, Member, Administrator).is_ok());
        assert!(check_role_change(Administrator, Member, Administrator).is_err());
        assert!(check_role_change(Founder, Member, Founder).is_err());
        assert!(check_role_change(Founder, Founder, Member).is_err());
    }
}
