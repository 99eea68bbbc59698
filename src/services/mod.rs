//! Business logic services

pub mod borrows;
pub mod catalog;
pub mod claims;
pub mod support;
pub mod users;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub borrows: borrows::BorrowsService,
    pub claims: claims::ClaimsService,
    pub support: support::SupportService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self {
            users: users::UsersService::new(repository.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            borrows: borrows::BorrowsService::new(repository.clone(), config.borrows.clone()),
            claims: claims::ClaimsService::new(repository.clone()),
            support: support::SupportService::new(repository),
        }
    }
}
