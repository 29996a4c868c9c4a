//! Business logic services

pub mod access;
pub mod attributes;
pub mod email;
pub mod groups;
pub mod images;
pub mod items;
pub mod lendings;
pub mod locations;
pub mod lookup;
pub mod notifier;
pub mod redis;
pub mod users;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub users: users::UsersService,
    pub items: items::ItemsService,
    pub attributes: attributes::AttributesService,
    pub images: images::ImagesService,
    pub locations: locations::LocationsService,
    pub lendings: lendings::LendingsService,
    pub groups: groups::GroupsService,
    pub lookup: lookup::LookupService,
    pub email: email::EmailService,
    pub redis: redis::RedisService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig, redis_service: redis::RedisService) -> AppResult<Self> {
        let email = email::EmailService::new(config.email.clone());
        let items = items::ItemsService::new(repository.clone());
        let locations = locations::LocationsService::new(repository.clone());

        Ok(Self {
            users: users::UsersService::new(
                repository.clone(),
                config.auth.clone(),
                redis_service.clone(),
                email.clone(),
            ),
            attributes: attributes::AttributesService::new(repository.clone(), items.clone()),
            images: images::ImagesService::new(repository.clone(), items.clone(), locations.clone()),
            lendings: lendings::LendingsService::new(repository.clone()),
            groups: groups::GroupsService::new(repository.clone()),
            lookup: lookup::LookupService::new(config.lookup.clone())?,
            items,
            locations,
            email,
            redis: redis_service,
            repository,
        })
    }

    /// Background reminder task for due lendings
    pub fn notifier(&self, config: &AppConfig) -> notifier::DueDateNotifier {
        notifier::DueDateNotifier::new(self.repository.clone(), self.email.clone(), config.notifier.clone())
    }
}
