//! Items repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::item::{CreateItem, Item, ItemQuery, ItemShort, UpdateItem},
};

#[derive(Clone)]
pub struct ItemsRepository {
    pool: Pool<Postgres>,
}

/// Remove an item and every row hanging off it.
///
/// Lendings left without any line are removed as well. Must run inside a transaction.
pub(crate) async fn delete_item_rows(conn: &mut PgConnection, item_id: i32) -> AppResult<()> {
    let lending_ids: Vec<i32> =
        sqlx::query_scalar("DELETE FROM item_lendings WHERE item_id = $1 RETURNING lending_id")
            .bind(item_id)
            .fetch_all(&mut *conn)
            .await?;

    if !lending_ids.is_empty() {
        sqlx::query(
            r#"
            DELETE FROM lendings l
            WHERE l.id = ANY($1)
              AND NOT EXISTS (SELECT 1 FROM item_lendings il WHERE il.lending_id = l.id)
            "#,
        )
        .bind(&lending_ids)
        .execute(&mut *conn)
        .await?;
    }

    for statement in [
        "DELETE FROM item_attributes WHERE item_id = $1",
        "DELETE FROM item_locations WHERE item_id = $1",
        "DELETE FROM item_images WHERE item_id = $1",
        "DELETE FROM item_user_groups WHERE item_id = $1",
    ] {
        sqlx::query(statement).bind(item_id).execute(&mut *conn).await?;
    }

    let result = sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Item with id {} not found", item_id)));
    }
    Ok(())
}

/// Replace the location links of an item. Must run inside a transaction.
async fn replace_item_locations(conn: &mut PgConnection, item_id: i32, location_ids: &[i32]) -> AppResult<()> {
    sqlx::query("DELETE FROM item_locations WHERE item_id = $1")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    if !location_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO item_locations (item_id, location_id)
            SELECT $1, UNNEST($2::int[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(item_id)
        .bind(location_ids)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

impl ItemsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get item by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Item> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    /// Search items visible to a user: owned ones, plus items shared through their groups
    pub async fn search(&self, user_id: i32, query: &ItemQuery) -> AppResult<(Vec<ItemShort>, i64)> {
        let per_page = query.per_page();
        let offset = (query.page() - 1) * per_page;
        let text = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
        let pattern = text.map(|q| format!("%{}%", q));
        let include_shared = query.include_shared.unwrap_or(true) || query.group_id.is_some();

        const FILTER: &str = r#"
            WHERE (
                i.user_id = $1
                OR ($2 AND EXISTS (
                    SELECT 1 FROM item_user_groups iug
                    JOIN user_group_memberships m ON m.group_id = iug.group_id
                    WHERE iug.item_id = i.id AND m.user_id = $1
                ))
            )
            AND ($3::text IS NULL OR i.name ILIKE $3 OR i.description ILIKE $3 OR i.barcode = $6)
            AND ($4::int IS NULL OR EXISTS (
                SELECT 1 FROM item_locations il WHERE il.item_id = i.id AND il.location_id = $4
            ))
            AND ($5::int IS NULL OR EXISTS (
                SELECT 1 FROM item_user_groups iug WHERE iug.item_id = i.id AND iug.group_id = $5
            ))
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM items i {}", FILTER))
            .bind(user_id)
            .bind(include_shared)
            .bind(&pattern)
            .bind(query.location_id)
            .bind(query.group_id)
            .bind(text)
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, ItemShort>(&format!(
            r#"
            SELECT i.id, i.user_id, i.name, i.quantity, i.barcode, i.updated_at
            FROM items i {}
            ORDER BY LOWER(i.name), i.id
            LIMIT $7 OFFSET $8
            "#,
            FILTER
        ))
        .bind(user_id)
        .bind(include_shared)
        .bind(&pattern)
        .bind(query.location_id)
        .bind(query.group_id)
        .bind(text)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    /// Whether the item is shared with a group the user belongs to
    pub async fn is_shared_with(&self, item_id: i32, user_id: i32) -> AppResult<bool> {
        let shared: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM item_user_groups iug
                JOIN user_group_memberships m ON m.group_id = iug.group_id
                WHERE iug.item_id = $1 AND m.user_id = $2
            )
            "#,
        )
        .bind(item_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(shared)
    }

    /// Create an item, optionally linking it to locations
    pub async fn create(&self, user_id: i32, item: &CreateItem) -> AppResult<Item> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (user_id, name, description, quantity, value, currency, barcode)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(item.name.trim())
        .bind(&item.description)
        .bind(item.quantity.unwrap_or(1))
        .bind(item.value)
        .bind(&item.currency)
        .bind(&item.barcode)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(ref location_ids) = item.location_ids {
            replace_item_locations(&mut tx, created.id, location_ids).await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Update provided fields of an item
    pub async fn update(&self, id: i32, item: &UpdateItem) -> AppResult<Item> {
        sqlx::query_as::<_, Item>(
            r#"
            UPDATE items SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                quantity = COALESCE($4, quantity),
                value = COALESCE($5, value),
                currency = COALESCE($6, currency),
                barcode = COALESCE($7, barcode),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(item.name.as_deref().map(str::trim))
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.value)
        .bind(&item.currency)
        .bind(&item.barcode)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    /// Delete an item with its attributes, images, location links, lendings and shares
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        delete_item_rows(&mut tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn set_locations(&self, item_id: i32, location_ids: &[i32]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        replace_item_locations(&mut tx, item_id, location_ids).await?;
        sqlx::query("UPDATE items SET updated_at = NOW() WHERE id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn location_ids(&self, item_id: i32) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar("SELECT location_id FROM item_locations WHERE item_id = $1 ORDER BY location_id")
            .bind(item_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    pub async fn group_ids(&self, item_id: i32) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar("SELECT group_id FROM item_user_groups WHERE item_id = $1 ORDER BY group_id")
            .bind(item_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// Units of the item out on open lendings
    pub async fn lent_quantity(&self, item_id: i32) -> AppResult<i64> {
        let lent: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(il.quantity), 0)::bigint
            FROM item_lendings il
            JOIN lendings l ON l.id = il.lending_id
            WHERE il.item_id = $1 AND l.return_date IS NULL
            "#,
        )
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(lent)
    }

    /// Items stored in a location
    pub async fn in_location(&self, location_id: i32) -> AppResult<Vec<ItemShort>> {
        let items = sqlx::query_as::<_, ItemShort>(
            r#"
            SELECT i.id, i.user_id, i.name, i.quantity, i.barcode, i.updated_at
            FROM items i
            JOIN item_locations il ON il.item_id = i.id
            WHERE il.location_id = $1
            ORDER BY LOWER(i.name)
            "#,
        )
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}

