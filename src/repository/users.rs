//! Users repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use super::{groups::delete_group_rows, items::delete_item_rows, locations::delete_user_locations};
use crate::{
    error::{AppError, AppResult},
    models::user::{RegisterUser, UpdateProfile, User, UserQuery, UserRole, UserShort},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Public view of a user, if they still exist
    pub async fn get_short(&self, id: i32) -> AppResult<Option<UserShort>> {
        let user = sqlx::query_as::<_, UserShort>("SELECT id, username, firstname, lastname FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Get user by username or email (login accepts either)
    pub async fn get_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($1)",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Get user by email
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Check if username already exists
    pub async fn username_exists(&self, username: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1) AND ($2::int IS NULL OR id != $2))",
        )
        .bind(username)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND ($2::int IS NULL OR id != $2))",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Search users by username or name, for borrower and member pickers
    pub async fn search(&self, query: &UserQuery) -> AppResult<(Vec<UserShort>, i64)> {
        let per_page = query.per_page();
        let offset = (query.page() - 1) * per_page;
        let pattern = query.q.as_ref().map(|q| format!("%{}%", q.to_lowercase()));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE $1::text IS NULL
               OR LOWER(username) LIKE $1
               OR LOWER(COALESCE(firstname, '')) LIKE $1
               OR LOWER(COALESCE(lastname, '')) LIKE $1
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let users = sqlx::query_as::<_, UserShort>(
            r#"
            SELECT id, username, firstname, lastname FROM users
            WHERE $1::text IS NULL
               OR LOWER(username) LIKE $1
               OR LOWER(COALESCE(firstname, '')) LIKE $1
               OR LOWER(COALESCE(lastname, '')) LIKE $1
            ORDER BY username
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((users, total))
    }

    /// Full user list (admin)
    pub async fn list(&self, page: i64, per_page: i64) -> AppResult<(Vec<User>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id LIMIT $1 OFFSET $2")
            .bind(per_page)
            .bind((page - 1) * per_page)
            .fetch_all(&self.pool)
            .await?;

        Ok((users, total))
    }

    /// Create a new user. The very first account becomes administrator.
    pub async fn create(&self, user: &RegisterUser, password_hash: &str) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password, firstname, lastname, role)
            VALUES ($1, $2, $3, $4, $5,
                    CASE WHEN EXISTS(SELECT 1 FROM users) THEN 'user' ELSE 'admin' END)
            RETURNING *
            "#,
        )
        .bind(user.username.trim())
        .bind(user.email.trim())
        .bind(password_hash)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update profile fields that were provided
    pub async fn update_profile(&self, id: i32, profile: &UpdateProfile) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                firstname = COALESCE($3, firstname),
                lastname = COALESCE($4, lastname),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&profile.username)
        .bind(&profile.firstname)
        .bind(&profile.lastname)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Replace the password hash and clear any lockout
    pub async fn update_password(&self, id: i32, password_hash: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET password = $2, failed_login_count = 0, lockout_until = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn confirm_email(&self, id: i32) -> AppResult<()> {
        sqlx::query("UPDATE users SET email_confirmed = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Count one failed login in a single statement. Reaching `max_failed` resets the
    /// counter and locks the account; the new lockout end is returned in that case.
    /// Accounts that are already locked are left untouched.
    pub async fn record_failed_login(
        &self,
        id: i32,
        max_failed: i32,
        lockout_minutes: i64,
    ) -> AppResult<Option<DateTime<Utc>>> {
        let lockout: Option<Option<DateTime<Utc>>> = sqlx::query_scalar(
            r#"
            UPDATE users SET
                failed_login_count = CASE WHEN failed_login_count + 1 >= $2 THEN 0
                                          ELSE failed_login_count + 1 END,
                lockout_until = CASE WHEN failed_login_count + 1 >= $2
                                     THEN NOW() + ($3::float8 * INTERVAL '1 minute')
                                     ELSE NULL END
            WHERE id = $1 AND (lockout_until IS NULL OR lockout_until <= NOW())
            RETURNING lockout_until
            "#,
        )
        .bind(id)
        .bind(max_failed)
        .bind(lockout_minutes)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lockout.flatten())
    }

    /// Clear the failed-login counter after a good password, unless a lockout started
    /// meanwhile. Returns false when the account is locked.
    pub async fn clear_failed_logins(&self, id: i32) -> AppResult<bool> {
        let cleared = sqlx::query(
            r#"
            UPDATE users SET failed_login_count = 0, lockout_until = NULL
            WHERE id = $1 AND (lockout_until IS NULL OR lockout_until <= NOW())
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(cleared.rows_affected() > 0)
    }

    /// Lift a lockout unconditionally
    pub async fn reset_login_failures(&self, id: i32) -> AppResult<()> {
        sqlx::query("UPDATE users SET failed_login_count = 0, lockout_until = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_role(&self, id: i32, role: UserRole) -> AppResult<User> {
        sqlx::query_as::<_, User>("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(role)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn count_admins(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Delete a user and everything they own, in one transaction
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let username: String = sqlx::query_scalar("SELECT username FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        // Groups founded by the user go with them
        let founded: Vec<i32> = sqlx::query_scalar(
            "SELECT group_id FROM user_group_memberships WHERE user_id = $1 AND role = 'founder'",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        for group_id in founded {
            delete_group_rows(&mut tx, group_id).await?;
        }
        sqlx::query("DELETE FROM user_group_memberships WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let emptied: Vec<i32> = sqlx::query_scalar(
            "SELECT g.id FROM user_groups g WHERE NOT EXISTS (SELECT 1 FROM user_group_memberships m WHERE m.group_id = g.id)",
        )
        .fetch_all(&mut *tx)
        .await?;
        for group_id in emptied {
            delete_group_rows(&mut tx, group_id).await?;
        }

        // Keep other users' lending history readable
        sqlx::query(
            "UPDATE lendings SET borrower_id = NULL, borrower_name = COALESCE(borrower_name, $2) WHERE borrower_id = $1",
        )
        .bind(id)
        .bind(&username)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM item_lendings WHERE lending_id IN (SELECT id FROM lendings WHERE lender_id = $1)")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM lendings WHERE lender_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let item_ids: Vec<i32> = sqlx::query_scalar("SELECT id FROM items WHERE user_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;
        for item_id in item_ids {
            delete_item_rows(&mut tx, item_id).await?;
        }

        delete_user_locations(&mut tx, id).await?;

        sqlx::query("DELETE FROM item_attributes WHERE attribute_id IN (SELECT id FROM attributes WHERE user_id = $1)")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM attributes WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
