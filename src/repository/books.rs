//! Books repository for database operations

use rust_decimal::Decimal;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, BookRow, UpdateBook},
};

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.isbn, b.publication_year, b.total_copies, b.copies_available,
           b.lost_fine, a.id AS author_id, a.name AS author_name,
           a.birth_date AS author_birth_date, a.biography AS author_biography
    FROM books b
    JOIN authors a ON a.id = b.author_id
"#;

/// Fields of a book ready to insert (ISBN normalised, copies resolved)
#[derive(Debug)]
pub struct NewBook<'a> {
    pub title: &'a str,
    pub isbn: &'a str,
    pub author_id: i64,
    pub publication_year: Option<i64>,
    pub total_copies: i64,
    pub copies_available: i64,
    pub lost_fine: Decimal,
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Sqlite>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// List books matching the query filters, ordered by title
    pub async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(BOOK_SELECT);
        builder.push(" WHERE 1 = 1");

        if query.only_available() {
            builder.push(" AND b.copies_available > 0");
        }
        if let Some(ref title) = query.title {
            builder.push(" AND b.title LIKE ").push_bind(format!("%{}%", title));
        }
        if let Some(ref isbn) = query.isbn {
            builder.push(" AND b.isbn LIKE ").push_bind(format!("%{}%", isbn));
        }
        if let Some(author_id) = query.author_id {
            builder.push(" AND b.author_id = ").push_bind(author_id);
        }
        if let Some(ref search) = query.search {
            let pattern = format!("%{}%", search);
            builder
                .push(" AND (b.title LIKE ")
                .push_bind(pattern.clone())
                .push(" OR b.isbn LIKE ")
                .push_bind(pattern.clone())
                .push(" OR a.name LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        builder.push(" ORDER BY b.title, b.id");

        let rows = builder
            .build_query_as::<BookRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Book> {
        sqlx::query_as::<_, BookRow>(&format!("{} WHERE b.id = ?1", BOOK_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Book::from)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Check if an ISBN is already used by another book
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i64>) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = ?1 AND id != ?2)")
                .bind(isbn)
                .bind(exclude_id.unwrap_or(0))
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn create(&self, book: &NewBook<'_>) -> AppResult<Book> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, isbn, author_id, publication_year, total_copies, copies_available, lost_fine)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING id
            "#,
        )
        .bind(book.title)
        .bind(book.isbn)
        .bind(book.author_id)
        .bind(book.publication_year)
        .bind(book.total_copies)
        .bind(book.copies_available)
        .bind(book.lost_fine.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "A book with this ISBN already exists"))?;

        self.get_by_id(id).await
    }

    /// Update a book. Changing `total_copies` shifts `copies_available` by the
    /// same delta; the update is refused if that would leave it negative.
    pub async fn update(&self, id: i64, book: &UpdateBook, isbn: Option<&str>, lost_fine: Option<Decimal>) -> AppResult<Book> {
        let result = sqlx::query(
            r#"
            UPDATE books SET
                title            = COALESCE(?2, title),
                isbn             = COALESCE(?3, isbn),
                author_id        = COALESCE(?4, author_id),
                publication_year = COALESCE(?5, publication_year),
                lost_fine        = COALESCE(?6, lost_fine),
                copies_available = copies_available + (COALESCE(?7, total_copies) - total_copies),
                total_copies     = COALESCE(?7, total_copies)
            WHERE id = ?1
              AND copies_available + (COALESCE(?7, total_copies) - total_copies) >= 0
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(isbn)
        .bind(book.author_id)
        .bind(book.publication_year)
        .bind(lost_fine.map(|f| f.to_string()))
        .bind(book.total_copies)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "A book with this ISBN already exists"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::Validation(
                "total_copies cannot be lower than the number of copies on loan".to_string(),
            ));
        }

        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}

/// Take one copy off the shelf. Returns `false` when none is available.
///
/// Check and decrement are one statement, so two borrowers racing for the
/// last copy cannot both get it.
pub(crate) async fn take_copy(conn: &mut SqliteConnection, book_id: i64) -> AppResult<bool> {
    let result = sqlx::query(
        "UPDATE books SET copies_available = copies_available - 1 WHERE id = ?1 AND copies_available > 0",
    )
    .bind(book_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Put one copy back on the shelf, never above `total_copies`
pub(crate) async fn release_copy(conn: &mut SqliteConnection, book_id: i64) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE books SET copies_available = copies_available + 1 WHERE id = ?1 AND copies_available < total_copies",
    )
    .bind(book_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Internal(format!(
            "Book {} already has all its copies on the shelf",
            book_id
        )));
    }
    Ok(())
}
