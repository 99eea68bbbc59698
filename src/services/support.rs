//! Support messages service

use validator::Validate;

use crate::{
    error::AppResult,
    models::support::{CreateSupportMessage, SupportMessage},
    repository::Repository,
};

#[derive(Clone)]
pub struct SupportService {
    repository: Repository,
}

impl SupportService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn create(&self, request: CreateSupportMessage) -> AppResult<SupportMessage> {
        request.validate()?;

        let message = self
            .repository
            .support
            .create(
                request.name.as_deref().unwrap_or_default(),
                request.email.as_deref().unwrap_or_default(),
                &request.message,
            )
            .await?;

        tracing::info!("Support message {} received", message.id);
        Ok(message)
    }

    /// All messages, newest first
    pub async fn list(&self) -> AppResult<Vec<SupportMessage>> {
        self.repository.support.list().await
    }
}
