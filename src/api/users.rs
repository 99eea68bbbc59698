//! User management endpoints (staff)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{
    error::AppResult,
    models::user::{CreateUser, UpdateUserStatus, User, UserShort},
    AppState,
};

use super::{ApiJson, AuthenticatedUser};

/// Outcome of a status update
#[derive(Serialize)]
pub struct StatusUpdated {
    pub detail: String,
    pub is_online: bool,
    pub is_blocked: bool,
}

/// List readers
pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<UserShort>>> {
    claims.require_staff()?;

    let users = state.services.users.list_users().await?;
    Ok(Json(users))
}

/// Create a user; the password defaults to `welcome`
pub async fn create_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(user): ApiJson<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    claims.require_staff()?;

    let created = state.services.users.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Set online/blocked flags or reset the password of a user
pub async fn update_user_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    ApiJson(update): ApiJson<UpdateUserStatus>,
) -> AppResult<Json<StatusUpdated>> {
    claims.require_staff()?;

    let status = state.services.users.update_status(id, update).await?;
    Ok(Json(StatusUpdated {
        detail: "status updated".to_string(),
        is_online: status.is_online,
        is_blocked: status.is_blocked,
    }))
}
