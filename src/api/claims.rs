//! Claim endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::claim::{ClaimDecisionRequest, ClaimDecisionResponse, ClaimDetails, CreateClaim},
    AppState,
};

use super::{ApiJson, AuthenticatedUser};

/// Staff get every claim, readers their own
pub async fn list_claims(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ClaimDetails>>> {
    let list = state.services.claims.list(&claims).await?;
    Ok(Json(list))
}

pub async fn create_claim(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(request): ApiJson<CreateClaim>,
) -> AppResult<(StatusCode, Json<ClaimDetails>)> {
    let claim = state.services.claims.file(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(claim)))
}

pub async fn get_claim(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ClaimDetails>> {
    let claim = state.services.claims.get(&claims, id).await?;
    Ok(Json(claim))
}

pub async fn delete_claim(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.claims.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /claims/{id}/approve/` or `POST /claims/{id}/decline/`
pub async fn claim_action(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, action)): Path<(i64, String)>,
) -> AppResult<Json<ClaimDecisionResponse>> {
    claims.require_staff()?;

    let approve = match action.as_str() {
        "approve" => true,
        "decline" => false,
        _ => return Err(AppError::Validation("invalid action".to_string())),
    };

    let decision = state.services.claims.decide(&claims, id, approve).await?;
    Ok(Json(decision))
}

/// Body form: `{"claim_id": 1, "approve": true}`; `approve` defaults to true
pub async fn decide_claim(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(request): ApiJson<ClaimDecisionRequest>,
) -> AppResult<Json<ClaimDecisionResponse>> {
    claims.require_staff()?;

    let claim_id = request
        .claim_id
        .ok_or_else(|| AppError::Validation("claim_id required".to_string()))?;

    let decision = state
        .services
        .claims
        .decide(&claims, claim_id, request.approve.unwrap_or(true))
        .await?;
    Ok(Json(decision))
}
