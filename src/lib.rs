//! MyVentory inventory server
//!
//! REST JSON API for keeping track of personal belongings: items with typed
//! attributes and images, nested storage locations, lendings to other people
//! and groups that share items among their members.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
