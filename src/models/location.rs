//! Storage location model (self-referencing hierarchy)

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::image::ImageInfo;
use super::item::ItemShort;
use crate::error::{AppError, AppResult};

/// Location row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Location {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Location with its direct children, stored items and images
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LocationDetails {
    #[serde(flatten)]
    pub location: Location,
    pub children: Vec<Location>,
    pub items: Vec<ItemShort>,
    pub images: Vec<ImageInfo>,
}

/// Node of the location tree
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LocationNode {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub children: Vec<LocationNode>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLocation {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateLocation {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    /// New parent location
    pub parent_id: Option<i32>,
    /// Detach from the current parent; ignored when `parent_id` is set
    pub move_to_root: Option<bool>,
}

/// Reject re-parenting that would make a location its own ancestor.
///
/// `parent_chain` lists the proposed parent followed by each of its ancestors up to the root.
pub fn validate_parent(location_id: i32, parent_id: i32, parent_chain: &[i32]) -> AppResult<()> {
    if parent_id == location_id {
        return Err(AppError::Validation(
            "A location cannot be its own parent".to_string(),
        ));
    }
    if parent_chain.contains(&location_id) {
        return Err(AppError::Validation(format!(
            "Location {} is a descendant of location {}",
            parent_id, location_id
        )));
    }
    Ok(())
}

/// Assemble flat rows into a forest, children sorted by name
pub fn build_tree(locations: Vec<Location>) -> Vec<LocationNode> {
    let mut by_parent: HashMap<Option<i32>, Vec<Location>> = HashMap::new();
    let known: std::collections::HashSet<i32> = locations.iter().map(|l| l.id).collect();

    for location in locations {
        // Orphans (parent not visible) are shown as roots
        let key = location.parent_id.filter(|p| known.contains(p));
        by_parent.entry(key).or_default().push(location);
    }

    fn attach(parent: Option<i32>, by_parent: &mut HashMap<Option<i32>, Vec<Location>>) -> Vec<LocationNode> {
        let mut level = by_parent.remove(&parent).unwrap_or_default();
        level.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        level
            .into_iter()
            .map(|l| LocationNode {
                id: l.id,
                children: attach(Some(l.id), by_parent),
                name: l.name,
                description: l.description,
            })
            .collect()
    }

    attach(None, &mut by_parent)
}
