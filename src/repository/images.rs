//! Image storage for items and locations

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::image::{ImageData, ImageInfo, NewImage},
};

/// What an image is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOwner {
    Item,
    Location,
}

impl ImageOwner {
    fn table(&self) -> &'static str {
        match self {
            ImageOwner::Item => "item_images",
            ImageOwner::Location => "location_images",
        }
    }

    fn owner_column(&self) -> &'static str {
        match self {
            ImageOwner::Item => "item_id",
            ImageOwner::Location => "location_id",
        }
    }
}

#[derive(Clone)]
pub struct ImagesRepository {
    pool: Pool<Postgres>,
}

impl ImagesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self, owner: ImageOwner, owner_id: i32) -> AppResult<Vec<ImageInfo>> {
        let images = sqlx::query_as::<_, ImageInfo>(&format!(
            "SELECT id, file_name, content_type, created_at FROM {} WHERE {} = $1 ORDER BY created_at",
            owner.table(),
            owner.owner_column()
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }

    pub async fn add(&self, owner: ImageOwner, owner_id: i32, image: &NewImage) -> AppResult<ImageInfo> {
        let info = sqlx::query_as::<_, ImageInfo>(&format!(
            r#"
            INSERT INTO {} (id, {}, file_name, content_type, data)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, file_name, content_type, created_at
            "#,
            owner.table(),
            owner.owner_column()
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&image.file_name)
        .bind(&image.content_type)
        .bind(&image.data)
        .fetch_one(&self.pool)
        .await?;
        Ok(info)
    }

    /// Image payload, scoped to its owner
    pub async fn get(&self, owner: ImageOwner, owner_id: i32, image_id: Uuid) -> AppResult<ImageData> {
        sqlx::query_as::<_, ImageData>(&format!(
            "SELECT id, content_type, data FROM {} WHERE id = $1 AND {} = $2",
            owner.table(),
            owner.owner_column()
        ))
        .bind(image_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Image {} not found", image_id)))
    }

    pub async fn delete(&self, owner: ImageOwner, owner_id: i32, image_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = $1 AND {} = $2",
            owner.table(),
            owner.owner_column()
        ))
        .bind(image_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Image {} not found", image_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_tables() {
        assert_eq!(ImageOwner::Item.table(), "item_images");
        assert_eq!(ImageOwner::Item.owner_column(), "item_id");
        assert_eq!(ImageOwner::Location.table(), "location_images");
        assert_eq!(ImageOwner::Location.owner_column(), "location_id");
    }
}
