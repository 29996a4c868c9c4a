//! API handlers for MyVentory REST endpoints

pub mod attributes;
pub mod auth;
pub mod groups;
pub mod health;
pub mod images;
pub mod items;
pub mod lendings;
pub mod locations;
pub mod lookup;
pub mod openapi;
pub mod users;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::{image::MAX_UPLOAD_BODY_BYTES, user::UserClaims},
    AppState,
};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token.trim(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Build the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication and own account
        .route("/auth/register", post(auth::register))
        .route("/auth/confirm-email", post(auth::confirm_email))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/me", get(auth::me))
        .route("/auth/profile", put(auth::update_profile))
        .route("/auth/password", put(auth::change_password))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/search", get(users::search_users))
        .route("/users/:id", get(users::get_user).delete(users::delete_user))
        .route("/users/:id/role", put(users::update_role))
        .route("/users/:id/unlock", post(users::unlock_user))
        // Items
        .route("/items", get(items::list_items).post(items::create_item))
        .route(
            "/items/:id",
            get(items::get_item).put(items::update_item).delete(items::delete_item),
        )
        .route("/items/:id/locations", put(items::set_item_locations))
        .route(
            "/items/:id/attributes",
            get(items::get_item_attributes).put(items::set_item_attributes),
        )
        .route(
            "/items/:id/images",
            get(images::list_item_images).post(images::upload_item_image)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route(
            "/items/:id/images/:image_id",
            get(images::download_item_image).delete(images::delete_item_image),
        )
        // Attributes
        .route("/attributes", get(attributes::list_attributes).post(attributes::create_attribute))
        .route("/attributes/:id", axum::routing::delete(attributes::delete_attribute))
        // Locations
        .route("/locations", get(locations::list_locations).post(locations::create_location))
        .route("/locations/tree", get(locations::location_tree))
        .route(
            "/locations/:id",
            get(locations::get_location)
                .put(locations::update_location)
                .delete(locations::delete_location),
        )
        .route(
            "/locations/:id/images",
            get(images::list_location_images).post(images::upload_location_image)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route(
            "/locations/:id/images/:image_id",
            get(images::download_location_image).delete(images::delete_location_image),
        )
        // Lendings
        .route("/lendings", post(lendings::create_lending))
        .route("/lendings/lent", get(lendings::list_lent))
        .route("/lendings/borrowed", get(lendings::list_borrowed))
        .route(
            "/lendings/:id",
            get(lendings::get_lending)
                .put(lendings::update_lending)
                .delete(lendings::delete_lending),
        )
        .route("/lendings/:id/end", post(lendings::end_lending))
        // Groups
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/groups/:id",
            get(groups::get_group).put(groups::update_group).delete(groups::delete_group),
        )
        .route("/groups/:id/members", get(groups::list_members).post(groups::add_member))
        .route(
            "/groups/:id/members/:user_id",
            put(groups::update_member_role).delete(groups::remove_member),
        )
        .route("/groups/:id/leave", post(groups::leave_group))
        .route("/groups/:id/items", get(groups::list_group_items).post(groups::share_item))
        .route("/groups/:id/items/:item_id", axum::routing::delete(groups::unshare_item))
        // External lookups
        .route("/lookup/book", get(lookup::lookup_book))
        .route("/lookup/album", get(lookup::lookup_album))
        .route("/lookup/barcode", get(lookup::lookup_barcode))
        .route(
            "/lookup/vision",
            post(lookup::lookup_vision).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
