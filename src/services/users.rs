//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        CreateUser, RegisterRequest, TokenPair, TokenType, UpdateUserStatus, User, UserClaims,
        UserShort, UserStatus,
    },
    repository::Repository,
};

/// Password given to accounts created or reset by staff
pub const DEFAULT_PASSWORD: &str = "welcome";

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Self-registration of a reader account
    pub async fn register(&self, request: RegisterRequest) -> AppResult<User> {
        request.validate()?;

        if self.repository.users.username_exists(&request.username).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let hash = self.hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(
                &request.username,
                request.email.as_deref().unwrap_or_default(),
                &hash,
                false,
            )
            .await?;

        tracing::info!("Registered user {} (id={})", user.username, user.id);
        Ok(user)
    }

    /// Check credentials and issue an access/refresh pair
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<TokenPair> {
        let invalid =
            || AppError::Authentication("No active account found with the given credentials".to_string());

        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Login attempt for unknown user {}", username);
                invalid()
            })?;

        if !self.verify_password(&user, password)? {
            tracing::warn!("Failed login attempt for {}", username);
            return Err(invalid());
        }

        Ok(TokenPair {
            access: self.issue(&user, TokenType::Access)?,
            refresh: self.issue(&user, TokenType::Refresh)?,
        })
    }

    /// Exchange a refresh token for a fresh access token
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<String> {
        let claims = UserClaims::from_token(refresh_token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Token is invalid or expired".to_string()))?;

        if claims.token_type != TokenType::Refresh {
            return Err(AppError::Authentication("Token has wrong type".to_string()));
        }

        // The account may have changed (or vanished) since the refresh token was issued
        let user = self
            .repository
            .users
            .get_by_id(claims.user_id)
            .await
            .map_err(|_| AppError::Authentication("User not found".to_string()))?;

        self.issue(&user, TokenType::Access)
    }

    fn issue(&self, user: &User, token_type: TokenType) -> AppResult<String> {
        let lifetime = match token_type {
            TokenType::Access => chrono::Duration::minutes(self.config.access_token_minutes),
            TokenType::Refresh => chrono::Duration::days(self.config.refresh_token_days),
        };

        UserClaims::new(user, token_type, lifetime)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn get_status(&self, user_id: i64) -> AppResult<UserStatus> {
        self.repository.users.get_status(user_id).await
    }

    /// Readers, for staff
    pub async fn list_users(&self) -> AppResult<Vec<UserShort>> {
        self.repository.users.list_readers().await
    }

    /// Staff-created account; password defaults to [`DEFAULT_PASSWORD`]
    pub async fn create_user(&self, request: CreateUser) -> AppResult<User> {
        request.validate()?;

        if self.repository.users.username_exists(&request.username).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let hash = self.hash_password(request.password.as_deref().unwrap_or(DEFAULT_PASSWORD))?;
        let user = self
            .repository
            .users
            .create(
                &request.username,
                request.email.as_deref().unwrap_or_default(),
                &hash,
                request.is_staff.unwrap_or(false),
            )
            .await?;

        tracing::info!("Staff created user {} (id={})", user.username, user.id);
        Ok(user)
    }

    /// Create the configured staff account unless the username is taken
    pub async fn ensure_staff(&self, username: &str, password: &str) -> AppResult<()> {
        if self.repository.users.username_exists(username).await? {
            return Ok(());
        }

        let hash = self.hash_password(password)?;
        let user = self.repository.users.create(username, "", &hash, true).await?;
        tracing::info!("Created staff account {} (id={})", user.username, user.id);
        Ok(())
    }

    /// Update status flags; `reset_password` puts the password back to the default
    pub async fn update_status(&self, user_id: i64, update: UpdateUserStatus) -> AppResult<UserStatus> {
        let user = self.repository.users.get_by_id(user_id).await?;

        let last_seen = update.is_online.map(|_| Utc::now());
        let status = self
            .repository
            .users
            .upsert_status(user.id, update.is_online, update.is_blocked, last_seen)
            .await?;

        if update.reset_password.unwrap_or(false) {
            let hash = self.hash_password(DEFAULT_PASSWORD)?;
            self.repository.users.update_password(user.id, &hash).await?;
            tracing::info!("Password reset for user {}", user.username);
        }

        Ok(status)
    }

    /// Verify password against the stored argon2 hash
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}
