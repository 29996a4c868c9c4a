//! Locations repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::location::{validate_parent, CreateLocation, Location},
};

#[derive(Clone)]
pub struct LocationsRepository {
    pool: Pool<Postgres>,
}

/// Drop every location of a user with its images and item links. Must run inside a transaction.
pub(crate) async fn delete_user_locations(conn: &mut PgConnection, user_id: i32) -> AppResult<()> {
    sqlx::query("DELETE FROM location_images WHERE location_id IN (SELECT id FROM locations WHERE user_id = $1)")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM item_locations WHERE location_id IN (SELECT id FROM locations WHERE user_id = $1)")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    // Break parent links first so rows can go in any order
    sqlx::query("UPDATE locations SET parent_id = NULL WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM locations WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Lock every location of one owner so hierarchy changes run one at a time.
/// Must run inside a transaction.
async fn lock_owner_locations(conn: &mut PgConnection, user_id: i32) -> AppResult<()> {
    sqlx::query("SELECT id FROM locations WHERE user_id = $1 ORDER BY id FOR UPDATE")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// The location id followed by each ancestor id up to the root
async fn ancestry_on(conn: &mut PgConnection, id: i32) -> AppResult<Vec<i32>> {
    let ids = sqlx::query_scalar(
        r#"
        WITH RECURSIVE chain(id, parent_id, depth) AS (
            SELECT id, parent_id, 0 FROM locations WHERE id = $1
            UNION ALL
            SELECT l.id, l.parent_id, c.depth + 1
            FROM locations l
            JOIN chain c ON l.id = c.parent_id
            WHERE c.depth < 1000
        )
        SELECT id FROM chain ORDER BY depth
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

impl LocationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Location> {
        sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Location with id {} not found", id)))
    }

    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT * FROM locations WHERE user_id = $1 ORDER BY LOWER(name), id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(locations)
    }

    pub async fn children(&self, id: i32) -> AppResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT * FROM locations WHERE parent_id = $1 ORDER BY LOWER(name), id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(locations)
    }

    /// Whether all ids name locations owned by the user
    pub async fn all_owned_by(&self, user_id: i32, ids: &[i32]) -> AppResult<bool> {
        if ids.is_empty() {
            return Ok(true);
        }
        let owned: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT id) FROM locations WHERE user_id = $1 AND id = ANY($2)",
        )
        .bind(user_id)
        .bind(ids)
        .fetch_one(&self.pool)
        .await?;

        let mut distinct = ids.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        Ok(owned == distinct.len() as i64)
    }

    pub async fn create(&self, user_id: i32, location: &CreateLocation) -> AppResult<Location> {
        let created = sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (user_id, name, description, parent_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(location.name.trim())
        .bind(&location.description)
        .bind(location.parent_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Update a location. `parent_id` is written as given, so callers resolve
    /// the final parent (kept, moved, or detached) before calling. The owner's
    /// locations stay locked while a new parent is checked against the current
    /// hierarchy, so two concurrent moves cannot close a cycle.
    pub async fn update(
        &self,
        id: i32,
        owner_id: i32,
        name: Option<&str>,
        description: Option<&str>,
        parent_id: Option<i32>,
    ) -> AppResult<Location> {
        let mut tx = self.pool.begin().await?;
        lock_owner_locations(&mut tx, owner_id).await?;

        if let Some(parent_id) = parent_id {
            let chain = ancestry_on(&mut tx, parent_id).await?;
            validate_parent(id, parent_id, &chain)?;
        }

        let updated = sqlx::query_as::<_, Location>(
            r#"
            UPDATE locations SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                parent_id = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name.map(str::trim))
        .bind(description)
        .bind(parent_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Location with id {} not found", id)))?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a location. Children move up to its parent and items are unlinked.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let owner_id: i32 = sqlx::query_scalar("SELECT user_id FROM locations WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Location with id {} not found", id)))?;
        lock_owner_locations(&mut tx, owner_id).await?;

        let parent_id: Option<i32> = sqlx::query_scalar("SELECT parent_id FROM locations WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Location with id {} not found", id)))?;

        sqlx::query("UPDATE locations SET parent_id = $2, updated_at = NOW() WHERE parent_id = $1")
            .bind(id)
            .bind(parent_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM item_locations WHERE location_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM location_images WHERE location_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
