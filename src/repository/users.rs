//! Users repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

use crate::{
    error::{AppError, AppResult},
    models::user::{User, UserShort, UserStatus},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Sqlite>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by username (authentication lookup)
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Check if username already exists
    pub async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Create a user together with its status row
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_staff: bool,
    ) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, is_staff, date_joined)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(is_staff)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "Username already exists"))?;

        sqlx::query("INSERT INTO user_statuses (user_id) VALUES (?1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Non-staff users, for staff pickers
    pub async fn list_readers(&self) -> AppResult<Vec<UserShort>> {
        let users = sqlx::query_as::<_, UserShort>(
            "SELECT id, username, email FROM users WHERE is_staff = 0 ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn update_password(&self, id: i64, password_hash: &str) -> AppResult<()> {
        sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Status flags; users created before the status table get the defaults
    pub async fn get_status(&self, user_id: i64) -> AppResult<UserStatus> {
        let status = sqlx::query_as::<_, UserStatus>(
            "SELECT user_id, is_online, is_blocked, last_seen FROM user_statuses WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(status.unwrap_or(UserStatus {
            user_id,
            ..UserStatus::default()
        }))
    }

    /// Insert or update the status row, keeping unspecified flags
    pub async fn upsert_status(
        &self,
        user_id: i64,
        is_online: Option<bool>,
        is_blocked: Option<bool>,
        last_seen: Option<DateTime<Utc>>,
    ) -> AppResult<UserStatus> {
        let status = sqlx::query_as::<_, UserStatus>(
            r#"
            INSERT INTO user_statuses (user_id, is_online, is_blocked, last_seen)
            VALUES (?1, COALESCE(?2, 0), COALESCE(?3, 0), ?4)
            ON CONFLICT (user_id) DO UPDATE SET
                is_online  = COALESCE(?2, is_online),
                is_blocked = COALESCE(?3, is_blocked),
                last_seen  = COALESCE(?4, last_seen)
            RETURNING user_id, is_online, is_blocked, last_seen
            "#,
        )
        .bind(user_id)
        .bind(is_online)
        .bind(is_blocked)
        .bind(last_seen)
        .fetch_one(&self.pool)
        .await?;

        Ok(status)
    }
}
