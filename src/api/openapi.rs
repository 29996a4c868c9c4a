//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{attributes, auth, groups, health, images, items, lendings, locations, lookup, users};

/// Registers the JWT bearer scheme referenced by secured paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MyVentory API",
        version = "1.0.0",
        description = "Personal inventory, lending and sharing REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::confirm_email,
        auth::login,
        auth::forgot_password,
        auth::reset_password,
        auth::me,
        auth::update_profile,
        auth::change_password,
        // Users
        users::list_users,
        users::search_users,
        users::get_user,
        users::delete_user,
        users::update_role,
        users::unlock_user,
        // Items
        items::list_items,
        items::get_item,
        items::create_item,
        items::update_item,
        items::delete_item,
        items::set_item_locations,
        items::get_item_attributes,
        items::set_item_attributes,
        // Images
        images::list_item_images,
        images::upload_item_image,
        images::download_item_image,
        images::delete_item_image,
        images::list_location_images,
        images::upload_location_image,
        images::download_location_image,
        images::delete_location_image,
        // Attributes
        attributes::list_attributes,
        attributes::create_attribute,
        attributes::delete_attribute,
        // Locations
        locations::list_locations,
        locations::location_tree,
        locations::get_location,
        locations::create_location,
        locations::update_location,
        locations::delete_location,
        // Lendings
        lendings::create_lending,
        lendings::list_lent,
        lendings::list_borrowed,
        lendings::get_lending,
        lendings::update_lending,
        lendings::delete_lending,
        lendings::end_lending,
        // Groups
        groups::list_groups,
        groups::create_group,
        groups::get_group,
        groups::update_group,
        groups::delete_group,
        groups::list_members,
        groups::add_member,
        groups::update_member_role,
        groups::remove_member,
        groups::leave_group,
        groups::list_group_items,
        groups::share_item,
        groups::unshare_item,
        // Lookup
        lookup::lookup_book,
        lookup::lookup_album,
        lookup::lookup_barcode,
        lookup::lookup_vision,
    ),
    components(
        schemas(
            // Users and auth
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::UserRole,
            crate::models::user::UserList,
            crate::models::user::UserShortList,
            crate::models::user::RegisterUser,
            crate::models::user::UpdateProfile,
            crate::models::user::ChangePassword,
            crate::models::user::UpdateRole,
            crate::models::user::LoginRequest,
            crate::models::user::LoginResponse,
            crate::models::user::ConfirmEmail,
            crate::models::user::ForgotPassword,
            crate::models::user::ResetPassword,
            // Items
            crate::models::item::Item,
            crate::models::item::ItemShort,
            crate::models::item::ItemDetails,
            crate::models::item::ItemList,
            crate::models::item::CreateItem,
            crate::models::item::UpdateItem,
            crate::models::item::SetItemLocations,
            // Attributes
            crate::models::attribute::Attribute,
            crate::models::attribute::AttributeType,
            crate::models::attribute::CreateAttribute,
            crate::models::attribute::ItemAttributeValue,
            crate::models::attribute::AttributeValueInput,
            crate::models::attribute::SetItemAttributes,
            // Images
            crate::models::image::ImageInfo,
            crate::models::image::UploadImage,
            // Locations
            crate::models::location::Location,
            crate::models::location::LocationDetails,
            crate::models::location::LocationNode,
            crate::models::location::CreateLocation,
            crate::models::location::UpdateLocation,
            // Lendings
            crate::models::lending::Lending,
            crate::models::lending::LendingStatus,
            crate::models::lending::LendingLine,
            crate::models::lending::LendingDetails,
            crate::models::lending::LendingItemInput,
            crate::models::lending::CreateLending,
            crate::models::lending::UpdateLending,
            // Groups
            crate::models::group::GroupRole,
            crate::models::group::UserGroup,
            crate::models::group::MyGroup,
            crate::models::group::GroupMember,
            crate::models::group::GroupDetails,
            crate::models::group::CreateGroup,
            crate::models::group::UpdateGroup,
            crate::models::group::AddMember,
            crate::models::group::UpdateMemberRole,
            crate::models::group::ShareItem,
            // Lookup
            crate::models::lookup::ExternalSearchResult,
            crate::models::lookup::ExternalAttribute,
            crate::models::lookup::VisionLookupRequest,
            // Health
            health::HealthResponse,
            health::ReadinessResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and own account"),
        (name = "users", description = "User directory and administration"),
        (name = "items", description = "Inventory items"),
        (name = "images", description = "Item and location images"),
        (name = "attributes", description = "Typed item attributes"),
        (name = "locations", description = "Storage locations"),
        (name = "lendings", description = "Lending items to other people"),
        (name = "groups", description = "Groups sharing items"),
        (name = "lookup", description = "External catalog lookups")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_secured_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/items/{id}"));
        assert!(doc.paths.paths.contains_key("/groups/{id}/members/{user_id}"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
