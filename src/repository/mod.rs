//! Repository layer for database operations

pub mod attributes;
pub mod groups;
pub mod images;
pub mod items;
pub mod lendings;
pub mod locations;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub items: items::ItemsRepository,
    pub attributes: attributes::AttributesRepository,
    pub images: images::ImagesRepository,
    pub locations: locations::LocationsRepository,
    pub lendings: lendings::LendingsRepository,
    pub groups: groups::GroupsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            items: items::ItemsRepository::new(pool.clone()),
            attributes: attributes::AttributesRepository::new(pool.clone()),
            images: images::ImagesRepository::new(pool.clone()),
            locations: locations::LocationsRepository::new(pool.clone()),
            lendings: lendings::LendingsRepository::new(pool.clone()),
            groups: groups::GroupsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connectivity check used by readiness
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
