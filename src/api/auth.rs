//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{
    error::AppResult,
    models::user::{LoginRequest, RefreshRequest, RegisterRequest, TokenPair, User, UserStatus},
    AppState,
};

use super::{ApiJson, AuthenticatedUser};

/// Fresh access token
#[derive(Serialize)]
pub struct AccessToken {
    pub access: String,
}

/// Authenticated user's profile
#[derive(Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub is_online: bool,
    pub is_blocked: bool,
}

/// Obtain an access/refresh token pair
pub async fn obtain_token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    let pair = state
        .services
        .users
        .authenticate(&request.username, &request.password)
        .await?;
    Ok(Json(pair))
}

/// Exchange a refresh token for a new access token
pub async fn refresh_token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> AppResult<Json<AccessToken>> {
    let access = state.services.users.refresh(&request.refresh).await?;
    Ok(Json(AccessToken { access }))
}

/// Register a reader account
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Get current user profile
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<MeResponse>> {
    let user = state.services.users.get_by_id(claims.user_id).await?;
    let UserStatus {
        is_online,
        is_blocked,
        ..
    } = state.services.users.get_status(user.id).await?;

    Ok(Json(MeResponse {
        user,
        is_online,
        is_blocked,
    }))
}
