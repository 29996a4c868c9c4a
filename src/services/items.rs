//! Item management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        image::ImageInfo,
        item::{CreateItem, Item, ItemDetails, ItemList, ItemQuery, SetItemLocations, UpdateItem},
        user::UserClaims,
    },
    repository::{images::ImageOwner, Repository},
    services::access::ensure_owner_or_admin,
};

#[derive(Clone)]
pub struct ItemsService {
    repository: Repository,
}

impl ItemsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Load an item the caller may see: own, shared with one of their groups, or any for admins
    pub async fn get_readable(&self, claims: &UserClaims, id: i32) -> AppResult<Item> {
        let item = self.repository.items.get_by_id(id).await?;
        if item.user_id == claims.user_id
            || claims.is_admin()
            || self.repository.items.is_shared_with(id, claims.user_id).await?
        {
            Ok(item)
        } else {
            Err(AppError::Authorization("You do not have access to this item".to_string()))
        }
    }

    /// Load an item the caller may modify: own, or any for admins
    pub async fn get_writable(&self, claims: &UserClaims, id: i32) -> AppResult<Item> {
        let item = self.repository.items.get_by_id(id).await?;
        ensure_owner_or_admin(claims, item.user_id, "item")?;
        Ok(item)
    }

    /// Search own items and items shared through groups
    pub async fn search(&self, claims: &UserClaims, query: &ItemQuery) -> AppResult<ItemList> {
        if let Some(group_id) = query.group_id {
            if self.repository.groups.member_role(group_id, claims.user_id).await?.is_none() {
                return Err(AppError::Authorization("You are not a member of this group".to_string()));
            }
        }

        let (items, total) = self.repository.items.search(claims.user_id, query).await?;
        Ok(ItemList {
            items,
            total,
            page: query.page(),
            per_page: query.per_page(),
        })
    }

    pub async fn get_details(&self, claims: &UserClaims, id: i32) -> AppResult<ItemDetails> {
        let item = self.get_readable(claims, id).await?;
        self.details(item).await
    }

    async fn details(&self, item: Item) -> AppResult<ItemDetails> {
        let attributes = self.repository.attributes.item_values(item.id).await?;
        let images: Vec<ImageInfo> = self.repository.images.list(ImageOwner::Item, item.id).await?;
        let location_ids = self.repository.items.location_ids(item.id).await?;
        let group_ids = self.repository.items.group_ids(item.id).await?;
        let lent_quantity = self.repository.items.lent_quantity(item.id).await?;

        Ok(ItemDetails {
            item,
            attributes,
            images,
            location_ids,
            group_ids,
            lent_quantity,
        })
    }

    async fn ensure_locations_owned(&self, owner_id: i32, location_ids: &[i32]) -> AppResult<()> {
        if self.repository.locations.all_owned_by(owner_id, location_ids).await? {
            Ok(())
        } else {
            Err(AppError::Validation(
                "Items can only be stored in their owner's locations".to_string(),
            ))
        }
    }

    pub async fn create(&self, claims: &UserClaims, item: CreateItem) -> AppResult<ItemDetails> {
        item.validate()?;
        if let Some(ref location_ids) = item.location_ids {
            self.ensure_locations_owned(claims.user_id, location_ids).await?;
        }

        let created = self.repository.items.create(claims.user_id, &item).await?;
        tracing::info!(user_id = claims.user_id, item_id = created.id, "Item created");
        self.details(created).await
    }

    pub async fn update(&self, claims: &UserClaims, id: i32, item: UpdateItem) -> AppResult<Item> {
        item.validate()?;
        self.get_writable(claims, id).await?;
        self.repository.items.update(id, &item).await
    }

    /// Delete an item with everything attached to it
    pub async fn delete(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        self.get_writable(claims, id).await?;
        self.repository.items.delete(id).await?;
        tracing::info!(user_id = claims.user_id, item_id = id, "Item deleted");
        Ok(())
    }

    pub async fn set_locations(&self, claims: &UserClaims, id: i32, request: SetItemLocations) -> AppResult<Vec<i32>> {
        let item = self.get_writable(claims, id).await?;
        self.ensure_locations_owned(item.user_id, &request.location_ids).await?;

        self.repository.items.set_locations(id, &request.location_ids).await?;
        self.repository.items.location_ids(id).await
    }
}
