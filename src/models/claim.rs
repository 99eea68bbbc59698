//! Claim model and the claim adjudication rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{
    book::BookShort,
    borrow::{Borrow, BorrowStatus},
    money, parse_money,
    user::UserShort,
};
use crate::error::{AppError, AppResult};

/// What the claimant asserts about the borrowed copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    /// The copy was seen (found) and the claimant offers to settle the fine
    Saw,
    /// The copy was handed back
    Returned,
}

impl ClaimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Saw => "saw",
            ClaimType::Returned => "returned",
        }
    }

    /// Reject claims that make no sense for the borrow's current state
    pub fn check_borrow(&self, borrow: &Borrow) -> AppResult<()> {
        match self {
            ClaimType::Saw if borrow.fine_paid => Err(AppError::BusinessRule(
                "Cannot claim 'saw' when fine already paid".to_string(),
            )),
            ClaimType::Saw if borrow.status == BorrowStatus::Returned => Err(AppError::BusinessRule(
                "Cannot submit 'saw' claim for a returned borrow".to_string(),
            )),
            ClaimType::Returned if borrow.status == BorrowStatus::Returned => Err(
                AppError::BusinessRule("Borrow is already returned".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Amount proposed on the claimant's behalf when none is given:
    /// a quarter of the book's lost fine for a `saw` claim on a lost borrow.
    pub fn default_offered_amount(&self, borrow: &Borrow, book_lost_fine: Decimal) -> Option<Decimal> {
        if *self == ClaimType::Saw
            && borrow.status == BorrowStatus::Lost
            && book_lost_fine > Decimal::ZERO
        {
            Some(money(book_lost_fine * Decimal::new(25, 2)))
        } else {
            None
        }
    }
}

impl std::fmt::Display for ClaimType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ClaimType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "saw" => Ok(ClaimType::Saw),
            "returned" => Ok(ClaimType::Returned),
            _ => Err(format!("Invalid claim type: {}", s)),
        }
    }
}

/// Claims go `pending -> approved | declined` and never change afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Declined,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Declined => "declined",
        }
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ClaimStatus::Pending),
            "approved" => Ok(ClaimStatus::Approved),
            "declined" => Ok(ClaimStatus::Declined),
            _ => Err(format!("Invalid claim status: {}", s)),
        }
    }
}

/// Check an offered amount against the fine the borrow currently carries
pub fn check_offered_amount(offered: Decimal, borrow: &Borrow, book_lost_fine: Decimal) -> AppResult<Decimal> {
    if offered < Decimal::ZERO {
        return Err(AppError::Validation("offered_amount must be >= 0".to_string()));
    }
    if offered > borrow.current_fine(book_lost_fine) {
        return Err(AppError::Validation(
            "offered_amount cannot exceed the current fine".to_string(),
        ));
    }
    Ok(money(offered))
}

/// Internal row structure for the `claims` table
#[derive(Debug, Clone, FromRow)]
pub struct ClaimRow {
    id: i64,
    borrow_id: i64,
    user_id: i64,
    claim_type: String,
    status: String,
    message: String,
    offered_amount: Option<String>,
    created_at: DateTime<Utc>,
    reviewed_by: Option<i64>,
    reviewed_at: Option<DateTime<Utc>>,
}

impl From<ClaimRow> for Claim {
    fn from(row: ClaimRow) -> Self {
        Claim {
            id: row.id,
            borrow_id: row.borrow_id,
            user_id: row.user_id,
            claim_type: row.claim_type.parse().unwrap_or(ClaimType::Returned),
            status: row.status.parse().unwrap_or(ClaimStatus::Pending),
            message: row.message,
            offered_amount: row.offered_amount.as_deref().map(parse_money),
            created_at: row.created_at,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
        }
    }
}

/// Claim model from database
#[derive(Debug, Clone, Serialize)]
pub struct Claim {
    pub id: i64,
    pub borrow_id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub status: ClaimStatus,
    pub message: String,
    pub offered_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Claim {
    pub fn ensure_pending(&self) -> AppResult<()> {
        if self.status != ClaimStatus::Pending {
            return Err(AppError::Conflict(format!("Claim already {}", self.status)));
        }
        Ok(())
    }

    /// Paid fine the borrow is closed with when this claim is approved.
    /// `None` when the borrow is already returned and approval changes nothing.
    pub fn closing_fine(&self, borrow: &Borrow) -> Option<Decimal> {
        if borrow.status == BorrowStatus::Returned {
            return None;
        }
        let fine = match self.claim_type {
            ClaimType::Returned => Decimal::ZERO,
            // A fine staff already collected stays as recorded
            ClaimType::Saw if borrow.fine_paid => borrow.fine_due,
            ClaimType::Saw => self.offered_amount.unwrap_or(borrow.fine_due),
        };
        Some(money(fine))
    }
}

/// Internal row structure for claim listings
#[derive(Debug, Clone, FromRow)]
pub struct ClaimDetailsRow {
    id: i64,
    claim_type: String,
    status: String,
    message: String,
    offered_amount: Option<String>,
    created_at: DateTime<Utc>,
    reviewed_by: Option<i64>,
    reviewed_at: Option<DateTime<Utc>>,
    user_id: i64,
    username: String,
    email: String,
    borrow_id: i64,
    borrow_status: String,
    borrow_fine_due: String,
    borrow_fine_paid: bool,
    book_id: i64,
    book_title: String,
    book_isbn: String,
}

impl From<ClaimDetailsRow> for ClaimDetails {
    fn from(row: ClaimDetailsRow) -> Self {
        ClaimDetails {
            id: row.id,
            user: UserShort {
                id: row.user_id,
                username: row.username,
                email: row.email,
            },
            borrow: ClaimBorrow {
                id: row.borrow_id,
                status: row.borrow_status.parse().unwrap_or(BorrowStatus::Active),
                fine_due: parse_money(&row.borrow_fine_due),
                fine_paid: row.borrow_fine_paid,
                book: BookShort {
                    id: row.book_id,
                    title: row.book_title,
                    isbn: row.book_isbn,
                },
            },
            claim_type: row.claim_type.parse().unwrap_or(ClaimType::Returned),
            status: row.status.parse().unwrap_or(ClaimStatus::Pending),
            message: row.message,
            offered_amount: row.offered_amount.as_deref().map(parse_money),
            created_at: row.created_at,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
        }
    }
}

/// Borrow summary nested in a claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimBorrow {
    pub id: i64,
    pub status: BorrowStatus,
    pub fine_due: Decimal,
    pub fine_paid: bool,
    pub book: BookShort,
}

/// Claim with claimant and borrow for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimDetails {
    pub id: i64,
    pub user: UserShort,
    pub borrow: ClaimBorrow,
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub status: ClaimStatus,
    pub message: String,
    pub offered_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Claim request (`POST /api/claims/`)
#[derive(Debug, Default, Deserialize)]
pub struct CreateClaim {
    pub borrow_id: Option<i64>,
    #[serde(rename = "type")]
    pub claim_type: Option<String>,
    pub message: Option<String>,
    pub offered_amount: Option<Decimal>,
}

/// Body form of a claim decision (`POST /api/claims/approve/`)
#[derive(Debug, Deserialize)]
pub struct ClaimDecisionRequest {
    pub claim_id: Option<i64>,
    pub approve: Option<bool>,
}

/// Outcome of a claim decision
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimDecisionResponse {
    pub detail: String,
    pub claim: ClaimDetails,
}
