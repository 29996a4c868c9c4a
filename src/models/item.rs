//! Item model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::attribute::ItemAttributeValue;
use super::image::ImageInfo;

/// Item row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Item {
    pub id: i32,
    /// Owner
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    /// Quantity currently on hand (lent units are not counted)
    pub quantity: i32,
    pub value: Option<f64>,
    pub currency: Option<String>,
    pub barcode: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item with everything hanging off it
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemDetails {
    #[serde(flatten)]
    pub item: Item,
    pub attributes: Vec<ItemAttributeValue>,
    pub images: Vec<ImageInfo>,
    pub location_ids: Vec<i32>,
    pub group_ids: Vec<i32>,
    /// Units currently out on open lendings
    pub lent_quantity: i64,
}

/// Short item representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ItemShort {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub quantity: i32,
    pub barcode: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Item search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ItemQuery {
    /// Text search in name and description
    pub q: Option<String>,
    pub location_id: Option<i32>,
    /// Restrict to items shared with this group
    pub group_id: Option<i32>,
    /// Include items shared with the caller through groups (default true)
    pub include_shared: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Paginated item list
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemList {
    pub items: Vec<ItemShort>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Create item request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    pub value: Option<f64>,
    #[validate(length(max = 8))]
    pub currency: Option<String>,
    #[validate(length(max = 64))]
    pub barcode: Option<String>,
    /// Locations to store the item in
    pub location_ids: Option<Vec<i32>>,
}

/// Update item request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateItem {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    pub value: Option<f64>,
    #[validate(length(max = 8))]
    pub currency: Option<String>,
    #[validate(length(max = 64))]
    pub barcode: Option<String>,
}

/// Replace the set of locations an item is stored in
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetItemLocations {
    pub location_ids: Vec<i32>,
}

impl ItemQuery {
    pub fn page(&self) -> i64 {
        super::page_bounds(self.page, self.per_page).0
    }

    pub fn per_page(&self) -> i64 {
        super::page_bounds(self.page, self.per_page).1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_bounds() {
        let query = ItemQuery {
            page: Some(0),
            per_page: Some(10_000),
            ..Default::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), 200);

        let query = ItemQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), 20);
    }

    #[test]
    fn test_negative_quantity_is_invalid() {
        let item = CreateItem {
            name: "Drill".to_string(),
            description: None,
            quantity: Some(-1),
            value: None,
            currency: None,
            barcode: None,
            location_ids: None,
        };
        assert!(item.validate().is_err());
    }
}
