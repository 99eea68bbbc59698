//! Borrow, return and fine endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::borrow::{BorrowAction, BorrowDetails, CreateBorrow},
    AppState,
};

use super::{ApiJson, AuthenticatedUser};

/// Borrow a book (staff may borrow on behalf of a user)
pub async fn create_borrow(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(request): ApiJson<CreateBorrow>,
) -> AppResult<(StatusCode, Json<BorrowDetails>)> {
    let borrow = state.services.borrows.borrow(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(borrow)))
}

pub async fn return_borrow(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(action): ApiJson<BorrowAction>,
) -> AppResult<Json<BorrowDetails>> {
    let borrow = state
        .services
        .borrows
        .return_borrow(&claims, action.borrow_id()?)
        .await?;
    Ok(Json(borrow))
}

pub async fn report_lost(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(action): ApiJson<BorrowAction>,
) -> AppResult<Json<BorrowDetails>> {
    let borrow = state
        .services
        .borrows
        .report_lost(&claims, action.borrow_id()?)
        .await?;
    Ok(Json(borrow))
}

/// Mark a fine as paid (staff)
pub async fn approve_fine(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(action): ApiJson<BorrowAction>,
) -> AppResult<Json<BorrowDetails>> {
    claims.require_staff()?;

    let borrow = state
        .services
        .borrows
        .approve_fine(&claims, action.borrow_id()?)
        .await?;
    Ok(Json(borrow))
}

pub async fn my_borrows(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowDetails>>> {
    let borrows = state.services.borrows.my_borrows(&claims).await?;
    Ok(Json(borrows))
}

/// Every borrow (staff)
pub async fn list_borrows(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowDetails>>> {
    claims.require_staff()?;

    let borrows = state.services.borrows.all_borrows().await?;
    Ok(Json(borrows))
}
