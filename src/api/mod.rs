//! API handlers for the library REST endpoints

pub mod auth;
pub mod authors;
pub mod books;
pub mod borrows;
pub mod claims;
pub mod health;
pub mod support;
pub mod users;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::user::{TokenType, UserClaims},
    AppState,
};

/// Extractor for authenticated user from JWT access token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Get the Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::Authentication("Authentication credentials were not provided".to_string())
            })?;

        // Check for Bearer token
        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Authentication("Invalid authorization header format".to_string())
        })?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        if claims.token_type != TokenType::Access {
            return Err(AppError::Authentication("Token has wrong type".to_string()));
        }

        Ok(AuthenticatedUser(claims))
    }
}

/// JSON body extractor whose rejections use the API error format
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections use the API error format
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Build the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health/", get(health::health_check))
        // Authentication
        .route("/token/", post(auth::obtain_token))
        .route("/token/refresh/", post(auth::refresh_token))
        .route("/auth/register/", post(auth::register))
        .route("/auth/me/", get(auth::me))
        // Catalog
        .route("/authors/", get(authors::list_authors).post(authors::create_author))
        .route(
            "/authors/:id/",
            get(authors::get_author)
                .put(authors::update_author)
                .delete(authors::delete_author),
        )
        .route("/books/", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id/",
            get(books::get_book).put(books::update_book).delete(books::delete_book),
        )
        // Borrows
        .route("/borrow/", post(borrows::create_borrow))
        .route("/return/", post(borrows::return_borrow))
        .route("/report-lost/", post(borrows::report_lost))
        .route("/approve-fine/", post(borrows::approve_fine))
        .route("/my-borrows/", get(borrows::my_borrows))
        .route("/borrows/", get(borrows::list_borrows))
        // Claims
        .route("/claims/", get(claims::list_claims).post(claims::create_claim))
        .route("/claims/approve/", post(claims::decide_claim))
        .route("/claims/:id/", get(claims::get_claim).delete(claims::delete_claim))
        .route("/claims/:id/:action/", post(claims::claim_action))
        // Users
        .route("/users/", get(users::list_users).post(users::create_user))
        .route("/users/:id/status/", post(users::update_user_status))
        // Support
        .route("/support/", get(support::list_messages).post(support::create_message))
        .with_state(state);

    Router::new().nest("/api", api).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    )
}
