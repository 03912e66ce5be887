//! Business logic services

pub mod catalog;
pub mod covers;
pub mod loans;
pub mod reports;
pub mod users;

use crate::{
    config::{AuthConfig, CatalogConfig, LoansConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub loans: loans::LoansService,
    pub reports: reports::ReportsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        loans_config: LoansConfig,
        catalog_config: CatalogConfig,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), catalog_config),
            users: users::UsersService::new(repository.clone(), auth_config),
            loans: loans::LoansService::new(repository.clone(), loans_config),
            reports: reports::ReportsService::new(repository),
        }
    }
}
