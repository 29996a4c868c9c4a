//! Attribute definitions and per-item attribute values

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::attribute::{Attribute, AttributeType, AttributeValueInput, ItemAttributeValue},
};

#[derive(Clone)]
pub struct AttributesRepository {
    pool: Pool<Postgres>,
}

impl AttributesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Built-in attributes plus the user's own, built-ins first
    pub async fn list_visible(&self, user_id: i32) -> AppResult<Vec<Attribute>> {
        let attributes = sqlx::query_as::<_, Attribute>(
            r#"
            SELECT id, name, data_type, user_id FROM attributes
            WHERE user_id IS NULL OR user_id = $1
            ORDER BY user_id NULLS FIRST, LOWER(name)
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attributes)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Attribute> {
        sqlx::query_as::<_, Attribute>("SELECT id, name, data_type, user_id FROM attributes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attribute with id {} not found", id)))
    }

    /// Fetch several attributes at once
    pub async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<Attribute>> {
        let attributes = sqlx::query_as::<_, Attribute>(
            "SELECT id, name, data_type, user_id FROM attributes WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(attributes)
    }

    /// Whether a name clashes with a built-in or one of the user's attributes
    pub async fn name_exists(&self, user_id: i32, name: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM attributes
                WHERE LOWER(name) = LOWER($2) AND (user_id IS NULL OR user_id = $1)
            )
            "#,
        )
        .bind(user_id)
        .bind(name.trim())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create(&self, user_id: i32, name: &str, data_type: AttributeType) -> AppResult<Attribute> {
        let attribute = sqlx::query_as::<_, Attribute>(
            r#"
            INSERT INTO attributes (name, data_type, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, data_type, user_id
            "#,
        )
        .bind(name.trim())
        .bind(data_type)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(attribute)
    }

    /// Delete a custom attribute together with the values using it
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM item_attributes WHERE attribute_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM attributes WHERE id = $1 AND user_id IS NOT NULL")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Attribute with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn item_values(&self, item_id: i32) -> AppResult<Vec<ItemAttributeValue>> {
        let values = sqlx::query_as::<_, ItemAttributeValue>(
            r#"
            SELECT ia.attribute_id, a.name, a.data_type, ia.value
            FROM item_attributes ia
            JOIN attributes a ON a.id = ia.attribute_id
            WHERE ia.item_id = $1
            ORDER BY a.user_id NULLS FIRST, LOWER(a.name)
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(values)
    }

    /// Replace every attribute value of an item
    pub async fn set_item_values(&self, item_id: i32, values: &[AttributeValueInput]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM item_attributes WHERE item_id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        for value in values {
            sqlx::query("INSERT INTO item_attributes (item_id, attribute_id, value) VALUES ($1, $2, $3)")
                .bind(item_id)
                .bind(value.attribute_id)
                .bind(value.value.trim())
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("UPDATE items SET updated_at = NOW() WHERE id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
