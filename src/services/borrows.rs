//! Borrow management service

use chrono::Utc;

use crate::{
    config::BorrowsConfig,
    error::{AppError, AppResult},
    models::{
        borrow::{BorrowDetails, CreateBorrow},
        user::{User, UserClaims},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
    config: BorrowsConfig,
}

impl BorrowsService {
    pub fn new(repository: Repository, config: BorrowsConfig) -> Self {
        Self { repository, config }
    }

    /// Borrow a book for the caller, or for another user when staff says so
    pub async fn borrow(&self, caller: &UserClaims, request: CreateBorrow) -> AppResult<BorrowDetails> {
        let book_id = request
            .book_id
            .ok_or_else(|| AppError::Validation("book_id is required".to_string()))?;
        let book = self.repository.books.get_by_id(book_id).await?;

        let borrower = self.resolve_borrower(caller, &request).await?;

        if !caller.is_staff() && self.repository.users.get_status(borrower.id).await?.is_blocked {
            return Err(AppError::Authorization("User is blocked".to_string()));
        }

        let due_date = match request.due_date {
            Some(due_date) if caller.is_staff() => due_date,
            _ => Utc::now() + chrono::Duration::days(self.config.loan_duration_days),
        };

        let borrow_id = self
            .repository
            .borrows
            .create(borrower.id, book.id, due_date)
            .await?;

        tracing::info!(
            "User {} borrowed book {} (borrow id={}, due {})",
            borrower.username,
            book.id,
            borrow_id,
            due_date
        );
        self.repository.borrows.get_details(borrow_id).await
    }

    async fn resolve_borrower(&self, caller: &UserClaims, request: &CreateBorrow) -> AppResult<User> {
        if caller.is_staff() {
            if let Some(ref username) = request.username {
                return self
                    .repository
                    .users
                    .get_by_username(username)
                    .await?
                    .ok_or_else(|| AppError::Validation(format!("username '{}' not found", username)));
            }
            if let Some(user_id) = request.user_id {
                return self.repository.users.get_by_id(user_id).await.map_err(|e| match e {
                    AppError::NotFound(_) => {
                        AppError::Validation(format!("user_id '{}' not found", user_id))
                    }
                    other => other,
                });
            }
        }
        self.repository.users.get_by_id(caller.user_id).await
    }

    /// Return an active borrow and put the copy back on the shelf
    pub async fn return_borrow(&self, caller: &UserClaims, borrow_id: i64) -> AppResult<BorrowDetails> {
        let borrow = self.repository.borrows.get_by_id(borrow_id).await?;
        caller.require_owner_or_staff(borrow.user_id, "Not allowed to return this borrow")?;
        borrow.ensure_returnable()?;

        self.repository.borrows.mark_returned(&borrow).await?;

        tracing::info!("Borrow {} returned by {}", borrow.id, caller.sub);
        self.repository.borrows.get_details(borrow.id).await
    }

    /// Flag an active borrow as lost; the book's lost fine becomes due
    pub async fn report_lost(&self, caller: &UserClaims, borrow_id: i64) -> AppResult<BorrowDetails> {
        let borrow = self.repository.borrows.get_by_id(borrow_id).await?;
        caller.require_owner_or_staff(borrow.user_id, "Not allowed to report this borrow")?;
        borrow.ensure_reportable_lost()?;

        let book = self.repository.books.get_by_id(borrow.book_id).await?;
        let fine_due = borrow.lost_fine_due(book.lost_fine);
        self.repository.borrows.mark_lost(borrow.id, fine_due).await?;

        tracing::info!("Borrow {} reported lost, fine due {}", borrow.id, fine_due);
        self.repository.borrows.get_details(borrow.id).await
    }

    /// Mark the fine of a lost or fined borrow as paid
    pub async fn approve_fine(&self, caller: &UserClaims, borrow_id: i64) -> AppResult<BorrowDetails> {
        let borrow = self.repository.borrows.get_by_id(borrow_id).await?;
        borrow.ensure_fine_approvable()?;
        self.repository.borrows.mark_fine_paid(borrow.id).await?;

        tracing::info!("Fine of borrow {} approved by {}", borrow.id, caller.sub);
        self.repository.borrows.get_details(borrow.id).await
    }

    /// Borrow history of the caller
    pub async fn my_borrows(&self, caller: &UserClaims) -> AppResult<Vec<BorrowDetails>> {
        self.repository.borrows.list_for_user(caller.user_id).await
    }

    /// Every borrow
    pub async fn all_borrows(&self) -> AppResult<Vec<BorrowDetails>> {
        self.repository.borrows.list_all().await
    }
}
