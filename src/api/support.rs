//! Support message endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::support::{CreateSupportMessage, SupportMessage},
    AppState,
};

use super::{ApiJson, AuthenticatedUser};

/// Anyone may write to the staff
pub async fn create_message(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateSupportMessage>,
) -> AppResult<(StatusCode, Json<SupportMessage>)> {
    let message = state.services.support.create(request).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_messages(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<SupportMessage>>> {
    claims.require_staff()?;

    let messages = state.services.support.list().await?;
    Ok(Json(messages))
}
