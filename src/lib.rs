//! Library borrowing server
//!
//! Authors, books, borrows and claim adjudication exposed as a REST JSON API
//! with bearer-token authentication.

use std::sync::Arc;

use sqlx::{Pool, Sqlite};

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

impl AppState {
    /// Wire repositories and services on top of a migrated pool
    pub fn new(config: AppConfig, pool: Pool<Sqlite>) -> Self {
        let repository = repository::Repository::new(pool);
        let services = services::Services::new(repository, &config);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
