//! Borrow model and the borrow/return state machine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{book::BookShort, money, parse_money, user::UserShort};
use crate::error::{AppError, AppResult};

/// Borrow lifecycle: `active -> returned` or `active -> lost`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Active,
    Returned,
    Lost,
}

impl BorrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Active => "active",
            BorrowStatus::Returned => "returned",
            BorrowStatus::Lost => "lost",
        }
    }
}

impl std::fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(BorrowStatus::Active),
            "returned" => Ok(BorrowStatus::Returned),
            "lost" => Ok(BorrowStatus::Lost),
            _ => Err(format!("Invalid borrow status: {}", s)),
        }
    }
}

/// Internal row structure for the `borrows` table
#[derive(Debug, Clone, FromRow)]
pub struct BorrowRow {
    id: i64,
    user_id: i64,
    book_id: i64,
    borrow_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    return_date: Option<DateTime<Utc>>,
    status: String,
    fine_due: String,
    fine_paid: bool,
}

impl From<BorrowRow> for Borrow {
    fn from(row: BorrowRow) -> Self {
        Borrow {
            id: row.id,
            user_id: row.user_id,
            book_id: row.book_id,
            borrow_date: row.borrow_date,
            due_date: row.due_date,
            return_date: row.return_date,
            status: row.status.parse().unwrap_or(BorrowStatus::Active),
            fine_due: parse_money(&row.fine_due),
            fine_paid: row.fine_paid,
        }
    }
}

/// Borrow model from database
#[derive(Debug, Clone, Serialize)]
pub struct Borrow {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    pub fine_due: Decimal,
    pub fine_paid: bool,
}

impl Borrow {
    /// Outstanding borrows block the same user from borrowing the same book again
    pub fn is_outstanding(&self) -> bool {
        match self.status {
            BorrowStatus::Active => true,
            BorrowStatus::Lost => !self.fine_paid,
            BorrowStatus::Returned => false,
        }
    }

    pub fn ensure_returnable(&self) -> AppResult<()> {
        if self.status != BorrowStatus::Active {
            return Err(AppError::BusinessRule(format!(
                "Borrow is {} and cannot be returned",
                self.status
            )));
        }
        Ok(())
    }

    pub fn ensure_reportable_lost(&self) -> AppResult<()> {
        match self.status {
            BorrowStatus::Active => Ok(()),
            BorrowStatus::Lost => Err(AppError::BusinessRule(
                "Borrow already marked lost".to_string(),
            )),
            BorrowStatus::Returned => Err(AppError::BusinessRule(
                "Borrow is returned and cannot be reported lost".to_string(),
            )),
        }
    }

    /// Fine owed once the borrow is reported lost
    pub fn lost_fine_due(&self, book_lost_fine: Decimal) -> Decimal {
        if book_lost_fine > Decimal::ZERO {
            money(book_lost_fine)
        } else {
            self.fine_due
        }
    }

    pub fn ensure_fine_approvable(&self) -> AppResult<()> {
        if self.fine_paid {
            return Err(AppError::BusinessRule("Fine already paid".to_string()));
        }
        if self.status != BorrowStatus::Lost && self.fine_due <= Decimal::ZERO {
            return Err(AppError::BusinessRule(
                "Borrow is not lost and carries no fine".to_string(),
            ));
        }
        Ok(())
    }

    /// The amount claims are measured against: the fine due, else the book's lost fine
    pub fn current_fine(&self, book_lost_fine: Decimal) -> Decimal {
        if self.fine_due > Decimal::ZERO {
            self.fine_due
        } else {
            money(book_lost_fine)
        }
    }
}

/// Internal row structure for borrow listings
#[derive(Debug, Clone, FromRow)]
pub struct BorrowDetailsRow {
    id: i64,
    user_id: i64,
    username: String,
    email: String,
    book_id: i64,
    book_title: String,
    book_isbn: String,
    borrow_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    return_date: Option<DateTime<Utc>>,
    status: String,
    fine_due: String,
    fine_paid: bool,
}

impl From<BorrowDetailsRow> for BorrowDetails {
    fn from(row: BorrowDetailsRow) -> Self {
        let status = row.status.parse().unwrap_or(BorrowStatus::Active);
        BorrowDetails {
            id: row.id,
            user: UserShort {
                id: row.user_id,
                username: row.username,
                email: row.email,
            },
            book: BookShort {
                id: row.book_id,
                title: row.book_title,
                isbn: row.book_isbn,
            },
            borrow_date: row.borrow_date,
            due_date: row.due_date,
            return_date: row.return_date,
            is_overdue: status == BorrowStatus::Active && row.due_date < Utc::now(),
            status,
            fine_due: parse_money(&row.fine_due),
            fine_paid: row.fine_paid,
        }
    }
}

/// Borrow with user and book for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowDetails {
    pub id: i64,
    pub user: UserShort,
    pub book: BookShort,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    pub fine_due: Decimal,
    pub fine_paid: bool,
    pub is_overdue: bool,
}

/// Borrow request (`POST /api/borrow/`)
#[derive(Debug, Default, Deserialize)]
pub struct CreateBorrow {
    pub book_id: Option<i64>,
    /// Staff only: borrow on behalf of this user
    pub username: Option<String>,
    /// Staff only: borrow on behalf of this user
    pub user_id: Option<i64>,
    /// Staff only: override the configured loan period
    pub due_date: Option<DateTime<Utc>>,
}

/// Body of return/report-lost/approve-fine requests
#[derive(Debug, Default, Deserialize)]
pub struct BorrowAction {
    pub borrow_id: Option<i64>,
}

impl BorrowAction {
    pub fn borrow_id(&self) -> AppResult<i64> {
        self.borrow_id
            .ok_or_else(|| AppError::Validation("borrow_id is required".to_string()))
    }
}
