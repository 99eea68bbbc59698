//! Borrows repository for database operations

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Sqlite, SqliteConnection};

use super::books;
use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{Borrow, BorrowDetails, BorrowDetailsRow, BorrowRow, BorrowStatus},
        money,
    },
};

const BORROW_DETAILS_SELECT: &str = r#"
    SELECT br.id, br.user_id, u.username, u.email, br.book_id,
           b.title AS book_title, b.isbn AS book_isbn,
           br.borrow_date, br.due_date, br.return_date, br.status, br.fine_due, br.fine_paid
    FROM borrows br
    JOIN users u ON u.id = br.user_id
    JOIN books b ON b.id = br.book_id
"#;

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Sqlite>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Get borrow by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Borrow> {
        sqlx::query_as::<_, BorrowRow>("SELECT * FROM borrows WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Borrow::from)
            .ok_or_else(|| AppError::NotFound(format!("Borrow with id {} not found", id)))
    }

    /// Get borrow with user and book
    pub async fn get_details(&self, id: i64) -> AppResult<BorrowDetails> {
        sqlx::query_as::<_, BorrowDetailsRow>(&format!("{} WHERE br.id = ?1", BORROW_DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(BorrowDetails::from)
            .ok_or_else(|| AppError::NotFound(format!("Borrow with id {} not found", id)))
    }

    /// Borrow history of a user, newest first
    pub async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<BorrowDetails>> {
        let rows = sqlx::query_as::<_, BorrowDetailsRow>(&format!(
            "{} WHERE br.user_id = ?1 ORDER BY br.borrow_date DESC, br.id DESC",
            BORROW_DETAILS_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BorrowDetails::from).collect())
    }

    /// Every borrow, newest first
    pub async fn list_all(&self) -> AppResult<Vec<BorrowDetails>> {
        let rows = sqlx::query_as::<_, BorrowDetailsRow>(&format!(
            "{} ORDER BY br.borrow_date DESC, br.id DESC",
            BORROW_DETAILS_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BorrowDetails::from).collect())
    }

    /// Create an active borrow and take a copy off the shelf, atomically
    pub async fn create(&self, user_id: i64, book_id: i64, due_date: DateTime<Utc>) -> AppResult<i64> {
        let mut tx = self.pool.begin().await?;

        // Must write before reading: a read snapshot cannot be upgraded once another borrow commits
        let took_copy = books::take_copy(&mut *tx, book_id).await?;

        let outstanding: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrows
                WHERE user_id = ?1 AND book_id = ?2
                  AND (status = 'active' OR (status = 'lost' AND fine_paid = 0))
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if outstanding {
            return Err(AppError::BusinessRule(
                "User already has an active borrow for this book".to_string(),
            ));
        }

        if !took_copy {
            return Err(AppError::BusinessRule("No copies available".to_string()));
        }

        let borrow_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO borrows (user_id, book_id, borrow_date, due_date, status, fine_due, fine_paid)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(Utc::now())
        .bind(due_date)
        .bind(BorrowStatus::Active.as_str())
        .bind(money(Decimal::ZERO).to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            match AppError::on_unique_violation(e, "User already has an active borrow for this book") {
                AppError::Conflict(msg) => AppError::BusinessRule(msg),
                other => other,
            }
        })?;

        tx.commit().await?;
        Ok(borrow_id)
    }

    /// Return an active borrow: clear its fine and restock the copy
    pub async fn mark_returned(&self, borrow: &Borrow) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let closed = close(&mut *tx, borrow, &[BorrowStatus::Active], money(Decimal::ZERO)).await?;
        if !closed {
            return Err(AppError::BusinessRule(
                "Borrow is already returned or not in 'active' state".to_string(),
            ));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Flag an active borrow as lost with the fine now owed
    pub async fn mark_lost(&self, id: i64, fine_due: Decimal) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE borrows SET status = ?2, fine_due = ?3, fine_paid = 0 WHERE id = ?1 AND status = ?4",
        )
        .bind(id)
        .bind(BorrowStatus::Lost.as_str())
        .bind(money(fine_due).to_string())
        .bind(BorrowStatus::Active.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BusinessRule("Borrow is no longer active".to_string()));
        }
        Ok(())
    }

    /// Record the fine as paid; the copy count is left alone
    pub async fn mark_fine_paid(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("UPDATE borrows SET fine_paid = 1 WHERE id = ?1 AND fine_paid = 0")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BusinessRule("Fine already paid".to_string()));
        }
        Ok(())
    }
}

/// Close a borrow that is in one of `from` and restock its copy.
/// Returns `false` when the borrow was not in any of those states.
pub(crate) async fn close(
    conn: &mut SqliteConnection,
    borrow: &Borrow,
    from: &[BorrowStatus],
    fine_due: Decimal,
) -> AppResult<bool> {
    let states = from
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    let result = sqlx::query(&format!(
        "UPDATE borrows SET status = ?2, return_date = ?3, fine_due = ?4, fine_paid = 1 \
         WHERE id = ?1 AND status IN ({})",
        states
    ))
    .bind(borrow.id)
    .bind(BorrowStatus::Returned.as_str())
    .bind(Utc::now())
    .bind(money(fine_due).to_string())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    books::release_copy(conn, borrow.book_id).await?;
    Ok(true)
}
