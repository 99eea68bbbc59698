//! Support messages repository

use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::{error::AppResult, models::support::SupportMessage};

#[derive(Clone)]
pub struct SupportRepository {
    pool: Pool<Sqlite>,
}

impl SupportRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, name: &str, email: &str, message: &str) -> AppResult<SupportMessage> {
        let created = sqlx::query_as::<_, SupportMessage>(
            r#"
            INSERT INTO support_messages (name, email, message, created_at, processed)
            VALUES (?1, ?2, ?3, ?4, 0)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(message)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Messages, newest first
    pub async fn list(&self) -> AppResult<Vec<SupportMessage>> {
        let messages = sqlx::query_as::<_, SupportMessage>(
            "SELECT * FROM support_messages ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }
}
