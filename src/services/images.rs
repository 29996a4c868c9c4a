//! Image upload and retrieval for items and locations

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        image::{ImageData, ImageInfo, UploadImage},
        user::UserClaims,
    },
    repository::{images::ImageOwner, Repository},
    services::{items::ItemsService, locations::LocationsService},
};

#[derive(Clone)]
pub struct ImagesService {
    repository: Repository,
    items: ItemsService,
    locations: LocationsService,
}

impl ImagesService {
    pub fn new(repository: Repository, items: ItemsService, locations: LocationsService) -> Self {
        Self {
            repository,
            items,
            locations,
        }
    }

    async fn ensure_readable(&self, claims: &UserClaims, owner: ImageOwner, owner_id: i32) -> AppResult<()> {
        match owner {
            ImageOwner::Item => self.items.get_readable(claims, owner_id).await.map(|_| ()),
            ImageOwner::Location => self.locations.get_owned(claims, owner_id).await.map(|_| ()),
        }
    }

    async fn ensure_writable(&self, claims: &UserClaims, owner: ImageOwner, owner_id: i32) -> AppResult<()> {
        match owner {
            ImageOwner::Item => self.items.get_writable(claims, owner_id).await.map(|_| ()),
            ImageOwner::Location => self.locations.get_owned(claims, owner_id).await.map(|_| ()),
        }
    }

    pub async fn upload(
        &self,
        claims: &UserClaims,
        owner: ImageOwner,
        owner_id: i32,
        upload: UploadImage,
    ) -> AppResult<ImageInfo> {
        upload.validate()?;
        self.ensure_writable(claims, owner, owner_id).await?;

        let image = upload.decode()?;
        let info = self.repository.images.add(owner, owner_id, &image).await?;
        tracing::info!(
            user_id = claims.user_id,
            owner = ?owner,
            owner_id,
            image_id = %info.id,
            bytes = image.data.len(),
            "Image uploaded"
        );
        Ok(info)
    }

    pub async fn list(&self, claims: &UserClaims, owner: ImageOwner, owner_id: i32) -> AppResult<Vec<ImageInfo>> {
        self.ensure_readable(claims, owner, owner_id).await?;
        self.repository.images.list(owner, owner_id).await
    }

    pub async fn download(
        &self,
        claims: &UserClaims,
        owner: ImageOwner,
        owner_id: i32,
        image_id: Uuid,
    ) -> AppResult<ImageData> {
        self.ensure_readable(claims, owner, owner_id).await?;
        self.repository.images.get(owner, owner_id, image_id).await
    }

    pub async fn delete(&self, claims: &UserClaims, owner: ImageOwner, owner_id: i32, image_id: Uuid) -> AppResult<()> {
        self.ensure_writable(claims, owner, owner_id).await?;
        self.repository.images.delete(owner, owner_id, image_id).await
    }
}
