//! Data models for MyVentory

pub mod attribute;
pub mod group;
pub mod image;
pub mod item;
pub mod lending;
pub mod location;
pub mod lookup;
pub mod user;

/// Page number (1-based) and page size after defaults and bounds
pub fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    (page.unwrap_or(1).max(1), per_page.unwrap_or(20).clamp(1, 200))
}

pub use attribute::{Attribute, AttributeType, ItemAttributeValue};
pub use group::{GroupRole, UserGroup};
pub use image::ImageInfo;
pub use item::{Item, ItemDetails, ItemShort};
pub use lending::{Lending, LendingDetails};
pub use location::Location;
pub use lookup::ExternalSearchResult;
pub use user::{User, UserClaims, UserRole, UserShort};
