//! Claims repository for database operations

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{Pool, Sqlite};

use super::borrows::close;
use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{Borrow, BorrowStatus},
        claim::{Claim, ClaimDetails, ClaimDetailsRow, ClaimRow, ClaimStatus, ClaimType},
    },
};

const CLAIM_DETAILS_SELECT: &str = r#"
    SELECT c.id, c.claim_type, c.status, c.message, c.offered_amount, c.created_at,
           c.reviewed_by, c.reviewed_at,
           u.id AS user_id, u.username, u.email,
           br.id AS borrow_id, br.status AS borrow_status,
           br.fine_due AS borrow_fine_due, br.fine_paid AS borrow_fine_paid,
           b.id AS book_id, b.title AS book_title, b.isbn AS book_isbn
    FROM claims c
    JOIN users u ON u.id = c.user_id
    JOIN borrows br ON br.id = c.borrow_id
    JOIN books b ON b.id = br.book_id
"#;

#[derive(Clone)]
pub struct ClaimsRepository {
    pool: Pool<Sqlite>,
}

impl ClaimsRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Claim> {
        sqlx::query_as::<_, ClaimRow>("SELECT * FROM claims WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Claim::from)
            .ok_or_else(|| AppError::NotFound(format!("Claim with id {} not found", id)))
    }

    /// Get claim with claimant and borrow
    pub async fn get_details(&self, id: i64) -> AppResult<ClaimDetails> {
        sqlx::query_as::<_, ClaimDetailsRow>(&format!("{} WHERE c.id = ?1", CLAIM_DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(ClaimDetails::from)
            .ok_or_else(|| AppError::NotFound(format!("Claim with id {} not found", id)))
    }

    /// Every claim, newest first
    pub async fn list_all(&self) -> AppResult<Vec<ClaimDetails>> {
        let rows = sqlx::query_as::<_, ClaimDetailsRow>(&format!(
            "{} ORDER BY c.created_at DESC, c.id DESC",
            CLAIM_DETAILS_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ClaimDetails::from).collect())
    }

    /// Claims filed by one user, newest first
    pub async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<ClaimDetails>> {
        let rows = sqlx::query_as::<_, ClaimDetailsRow>(&format!(
            "{} WHERE c.user_id = ?1 ORDER BY c.created_at DESC, c.id DESC",
            CLAIM_DETAILS_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ClaimDetails::from).collect())
    }

    pub async fn create(
        &self,
        borrow_id: i64,
        user_id: i64,
        claim_type: ClaimType,
        message: &str,
        offered_amount: Option<Decimal>,
    ) -> AppResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO claims (borrow_id, user_id, claim_type, status, message, offered_amount, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING id
            "#,
        )
        .bind(borrow_id)
        .bind(user_id)
        .bind(claim_type.as_str())
        .bind(ClaimStatus::Pending.as_str())
        .bind(message)
        .bind(offered_amount.map(|a| a.to_string()))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM claims WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Claim with id {} not found", id)));
        }
        Ok(())
    }

    /// Move a pending claim to `status` and, when `closing` is given, return its
    /// borrow with that paid fine, all in one transaction.
    /// Returns whether the borrow was closed.
    pub async fn resolve(
        &self,
        claim_id: i64,
        reviewer_id: i64,
        status: ClaimStatus,
        closing: Option<(&Borrow, Decimal)>,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE claims SET status = ?2, reviewed_by = ?3, reviewed_at = ?4 WHERE id = ?1 AND status = ?5",
        )
        .bind(claim_id)
        .bind(status.as_str())
        .bind(reviewer_id)
        .bind(Utc::now())
        .bind(ClaimStatus::Pending.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict("Claim has already been resolved".to_string()));
        }

        let closed = match closing {
            Some((borrow, fine_due)) => {
                close(&mut *tx, borrow, &[BorrowStatus::Active, BorrowStatus::Lost], fine_due).await?
            }
            None => false,
        };

        tx.commit().await?;
        Ok(closed)
    }
}
