//! User groups, memberships and item shares

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        group::{CreateGroup, GroupMember, GroupRole, MyGroup, UpdateGroup, UserGroup},
        item::ItemShort,
    },
};

#[derive(Clone)]
pub struct GroupsRepository {
    pool: Pool<Postgres>,
}

/// Remove a group with its shares and memberships. Must run inside a transaction.
pub(crate) async fn delete_group_rows(conn: &mut PgConnection, group_id: i32) -> AppResult<()> {
    sqlx::query("DELETE FROM item_user_groups WHERE group_id = $1")
        .bind(group_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM user_group_memberships WHERE group_id = $1")
        .bind(group_id)
        .execute(&mut *conn)
        .await?;
    let result = sqlx::query("DELETE FROM user_groups WHERE id = $1")
        .bind(group_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Group with id {} not found", group_id)));
    }
    Ok(())
}

impl GroupsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create a group with `founder_id` as its founder
    pub async fn create(&self, founder_id: i32, group: &CreateGroup) -> AppResult<UserGroup> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, UserGroup>(
            "INSERT INTO user_groups (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(group.name.trim())
        .bind(&group.description)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO user_group_memberships (group_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(created.id)
            .bind(founder_id)
            .bind(GroupRole::Founder)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<UserGroup> {
        sqlx::query_as::<_, UserGroup>("SELECT * FROM user_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group with id {} not found", id)))
    }

    /// Groups the user belongs to, with their role in each
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<MyGroup>> {
        let groups = sqlx::query_as::<_, MyGroup>(
            r#"
            SELECT g.id, g.name, g.description, m.role,
                   (SELECT COUNT(*) FROM user_group_memberships c WHERE c.group_id = g.id) AS member_count
            FROM user_groups g
            JOIN user_group_memberships m ON m.group_id = g.id
            WHERE m.user_id = $1
            ORDER BY LOWER(g.name)
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    pub async fn update(&self, id: i32, group: &UpdateGroup) -> AppResult<UserGroup> {
        sqlx::query_as::<_, UserGroup>(
            r#"
            UPDATE user_groups SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(group.name.as_deref().map(str::trim))
        .bind(&group.description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group with id {} not found", id)))
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        delete_group_rows(&mut tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Role of a user in a group, `None` when not a member
    pub async fn member_role(&self, group_id: i32, user_id: i32) -> AppResult<Option<GroupRole>> {
        let role = sqlx::query_scalar::<_, GroupRole>(
            "SELECT role FROM user_group_memberships WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    pub async fn members(&self, group_id: i32) -> AppResult<Vec<GroupMember>> {
        let members = sqlx::query_as::<_, GroupMember>(
            r#"
            SELECT m.user_id, u.username, m.role, m.joined_at
            FROM user_group_memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.group_id = $1
            ORDER BY m.joined_at, u.username
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    /// Add a member. Fails with a conflict when they already belong to the group.
    pub async fn add_member(&self, group_id: i32, user_id: i32, role: GroupRole) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_group_memberships (group_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (group_id, user_id) DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "User {} is already a member of group {}",
                user_id, group_id
            )));
        }
        Ok(())
    }

    pub async fn set_member_role(&self, group_id: i32, user_id: i32, role: GroupRole) -> AppResult<()> {
        let result = sqlx::query("UPDATE user_group_memberships SET role = $3 WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .bind(role)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "User {} is not a member of group {}",
                user_id, group_id
            )));
        }
        Ok(())
    }

    /// Remove a membership along with the items that member shared into the group
    pub async fn remove_member(&self, group_id: i32, user_id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM item_user_groups iug
            USING items i
            WHERE iug.item_id = i.id AND iug.group_id = $1 AND i.user_id = $2
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM user_group_memberships WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "User {} is not a member of group {}",
                user_id, group_id
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn share_item(&self, group_id: i32, item_id: i32, shared_by: i32) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO item_user_groups (item_id, group_id, shared_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (item_id, group_id) DO NOTHING
            "#,
        )
        .bind(item_id)
        .bind(group_id)
        .bind(shared_by)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Item {} is already shared with group {}",
                item_id, group_id
            )));
        }
        Ok(())
    }

    pub async fn unshare_item(&self, group_id: i32, item_id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM item_user_groups WHERE group_id = $1 AND item_id = $2")
            .bind(group_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Item {} is not shared with group {}",
                item_id, group_id
            )));
        }
        Ok(())
    }

    pub async fn items(&self, group_id: i32) -> AppResult<Vec<ItemShort>> {
        let items = sqlx::query_as::<_, ItemShort>(
            r#"
            SELECT i.id, i.user_id, i.name, i.quantity, i.barcode, i.updated_at
            FROM items i
            JOIN item_user_groups iug ON iug.item_id = i.id
            WHERE iug.group_id = $1
            ORDER BY LOWER(i.name)
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}
