//! Storage location service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        location::{build_tree, CreateLocation, Location, LocationDetails, LocationNode, UpdateLocation},
        user::UserClaims,
    },
    repository::{images::ImageOwner, Repository},
    services::access::ensure_owner_or_admin,
};

/// Parent a location should end up with after an update
pub fn resolve_parent(current: Option<i32>, requested: Option<i32>, move_to_root: bool) -> Option<i32> {
    match (requested, move_to_root) {
        (Some(parent), _) => Some(parent),
        (None, true) => None,
        (None, false) => current,
    }
}

#[derive(Clone)]
pub struct LocationsService {
    repository: Repository,
}

impl LocationsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Load a location owned by the caller (or any, for admins)
    pub async fn get_owned(&self, claims: &UserClaims, id: i32) -> AppResult<Location> {
        let location = self.repository.locations.get_by_id(id).await?;
        ensure_owner_or_admin(claims, location.user_id, "location")?;
        Ok(location)
    }

    pub async fn list(&self, claims: &UserClaims) -> AppResult<Vec<Location>> {
        self.repository.locations.list_for_user(claims.user_id).await
    }

    /// Own locations as a forest
    pub async fn tree(&self, claims: &UserClaims) -> AppResult<Vec<LocationNode>> {
        let locations = self.repository.locations.list_for_user(claims.user_id).await?;
        Ok(build_tree(locations))
    }

    pub async fn get_details(&self, claims: &UserClaims, id: i32) -> AppResult<LocationDetails> {
        let location = self.get_owned(claims, id).await?;
        let children = self.repository.locations.children(id).await?;
        let items = self.repository.items.in_location(id).await?;
        let images = self.repository.images.list(ImageOwner::Location, id).await?;

        Ok(LocationDetails {
            location,
            children,
            items,
            images,
        })
    }

    /// A new parent must exist and belong to the same owner. The cycle check runs
    /// in the repository, under the owner's lock.
    async fn check_parent(&self, owner_id: i32, parent_id: i32) -> AppResult<()> {
        let parent = self.repository.locations.get_by_id(parent_id).await.map_err(|e| match e {
            AppError::NotFound(_) => AppError::Validation(format!("Parent location {} does not exist", parent_id)),
            other => other,
        })?;
        if parent.user_id != owner_id {
            return Err(AppError::Validation(
                "Parent location belongs to another user".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create(&self, claims: &UserClaims, request: CreateLocation) -> AppResult<Location> {
        request.validate()?;
        if let Some(parent_id) = request.parent_id {
            self.check_parent(claims.user_id, parent_id).await?;
        }

        let location = self.repository.locations.create(claims.user_id, &request).await?;
        tracing::info!(user_id = claims.user_id, location_id = location.id, "Location created");
        Ok(location)
    }

    pub async fn update(&self, claims: &UserClaims, id: i32, request: UpdateLocation) -> AppResult<Location> {
        request.validate()?;
        let location = self.get_owned(claims, id).await?;

        let parent_id = resolve_parent(
            location.parent_id,
            request.parent_id,
            request.move_to_root.unwrap_or(false),
        );
        if let Some(parent_id) = parent_id {
            if Some(parent_id) != location.parent_id {
                self.check_parent(location.user_id, parent_id).await?;
            }
        }

        self.repository
            .locations
            .update(id, location.user_id, request.name.as_deref(), request.description.as_deref(), parent_id)
            .await
    }

    /// Delete a location; its children move up one level
    pub async fn delete(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        self.get_owned(claims, id).await?;
        self.repository.locations.delete(id).await?;
        tracing::info!(user_id = claims.user_id, location_id = id, "Location deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_parent() {
        assert_eq!(resolve_parent(Some(2), None, false), Some(2));
        assert_eq!(resolve_parent(Some(2), None, true), None);
        assert_eq!(resolve_parent(Some(2), Some(5), false), Some(5));
        assert_eq!(resolve_parent(None, Some(5), true), Some(5));
    }
}
