//! Catalog management service: authors and books

use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{normalize_isbn, validate_fine, Book, BookQuery, CreateBook, UpdateBook},
    },
    repository::{books::NewBook, Repository},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.repository.authors.list().await
    }

    pub async fn get_author(&self, id: i64) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn create_author(&self, author: CreateAuthor) -> AppResult<Author> {
        author.validate()?;
        let created = self.repository.authors.create(&author).await?;
        tracing::info!("Created author {} (id={})", created.name, created.id);
        Ok(created)
    }

    pub async fn update_author(&self, id: i64, author: UpdateAuthor) -> AppResult<Author> {
        author.validate()?;
        self.repository.authors.update(id, &author).await
    }

    /// Delete an author and, through the foreign key, all of their books
    pub async fn delete_author(&self, id: i64) -> AppResult<()> {
        self.repository.authors.delete(id).await?;
        tracing::info!("Deleted author id={}", id);
        Ok(())
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.search(query).await
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;

        let isbn = normalize_isbn(&book.isbn)?;
        let (total_copies, copies_available) = book.initial_copies()?;
        let lost_fine = validate_fine(book.lost_fine.unwrap_or(Decimal::ZERO), "lost_fine")?;

        self.ensure_author(book.author_id).await?;
        if self.repository.books.isbn_exists(&isbn, None).await? {
            return Err(AppError::Conflict("A book with this ISBN already exists".to_string()));
        }

        let created = self
            .repository
            .books
            .create(&NewBook {
                title: &book.title,
                isbn: &isbn,
                author_id: book.author_id,
                publication_year: book.publication_year,
                total_copies,
                copies_available,
                lost_fine,
            })
            .await?;

        tracing::info!("Created book {} (id={}, isbn={})", created.title, created.id, created.isbn);
        Ok(created)
    }

    pub async fn update_book(&self, id: i64, book: UpdateBook) -> AppResult<Book> {
        book.validate()?;

        // 404 before any field validation against other rows
        self.repository.books.get_by_id(id).await?;

        let isbn = match book.isbn.as_deref() {
            Some(raw) => {
                let isbn = normalize_isbn(raw)?;
                if self.repository.books.isbn_exists(&isbn, Some(id)).await? {
                    return Err(AppError::Conflict(
                        "A book with this ISBN already exists".to_string(),
                    ));
                }
                Some(isbn)
            }
            None => None,
        };
        if let Some(author_id) = book.author_id {
            self.ensure_author(author_id).await?;
        }
        let lost_fine = book
            .lost_fine
            .map(|fine| validate_fine(fine, "lost_fine"))
            .transpose()?;

        self.repository
            .books
            .update(id, &book, isbn.as_deref(), lost_fine)
            .await
    }

    pub async fn delete_book(&self, id: i64) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!("Deleted book id={}", id);
        Ok(())
    }

    async fn ensure_author(&self, author_id: i64) -> AppResult<()> {
        if !self.repository.authors.exists(author_id).await? {
            return Err(AppError::Validation(format!(
                "author_id: author {} does not exist",
                author_id
            )));
        }
        Ok(())
    }
}
