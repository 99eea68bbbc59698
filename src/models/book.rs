//! Book model, ISBN handling and related types

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{author::Author, money, parse_money};
use crate::error::{AppError, AppResult};

static ISBN_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9]{9}[0-9X]|[0-9]{13})$").expect("valid ISBN regex"));

/// Internal row structure for book queries joined with their author
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    id: i64,
    title: String,
    isbn: String,
    publication_year: Option<i64>,
    total_copies: i64,
    copies_available: i64,
    lost_fine: String,
    author_id: i64,
    author_name: String,
    author_birth_date: Option<NaiveDate>,
    author_biography: String,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book {
            id: row.id,
            title: row.title,
            isbn: row.isbn,
            author: Author {
                id: row.author_id,
                name: row.author_name,
                birth_date: row.author_birth_date,
                biography: row.author_biography,
            },
            publication_year: row.publication_year,
            total_copies: row.total_copies,
            copies_available: row.copies_available,
            lost_fine: parse_money(&row.lost_fine),
        }
    }
}

/// Book with its author, as served by the catalog endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub isbn: String,
    pub author: Author,
    pub publication_year: Option<i64>,
    pub total_copies: i64,
    pub copies_available: i64,
    pub lost_fine: Decimal,
}

impl Book {
    pub fn copies_on_loan(&self) -> i64 {
        self.total_copies - self.copies_available
    }
}

/// Short book representation nested in borrows and claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookShort {
    pub id: i64,
    pub title: String,
    pub isbn: String,
}

/// Create book request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,
    pub isbn: String,
    pub author_id: i64,
    pub publication_year: Option<i64>,
    #[validate(range(min = 0, message = "total_copies must be 0 or greater"))]
    pub total_copies: Option<i64>,
    #[validate(range(min = 0, message = "copies_available must be 0 or greater"))]
    pub copies_available: Option<i64>,
    pub lost_fine: Option<Decimal>,
}

impl CreateBook {
    /// Resolve `(total_copies, copies_available)`; a new book defaults to one copy on the shelf
    pub fn initial_copies(&self) -> AppResult<(i64, i64)> {
        let total = self.total_copies.or(self.copies_available).unwrap_or(1);
        let available = self.copies_available.unwrap_or(total);
        if available > total {
            return Err(AppError::Validation(
                "copies_available cannot exceed total_copies".to_string(),
            ));
        }
        Ok((total, available))
    }
}

/// Update book request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub author_id: Option<i64>,
    pub publication_year: Option<i64>,
    /// Copies on loan stay on loan; `copies_available` moves by the same delta
    #[validate(range(min = 0, message = "total_copies must be 0 or greater"))]
    pub total_copies: Option<i64>,
    pub lost_fine: Option<Decimal>,
}

/// Book list filters
#[derive(Debug, Default, Deserialize)]
pub struct BookQuery {
    /// `1`, `true` or `yes` keeps only books with a copy on the shelf
    pub available: Option<String>,
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub author_id: Option<i64>,
    /// Matches title, ISBN or author name
    pub search: Option<String>,
}

impl BookQuery {
    pub fn only_available(&self) -> bool {
        matches!(
            self.available.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("1") | Some("true") | Some("yes")
        )
    }
}

/// Check a fine amount and normalise it to cents
pub fn validate_fine(amount: Decimal, field: &str) -> AppResult<Decimal> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AppError::Validation(format!("{} must be 0 or greater", field)));
    }
    Ok(money(amount))
}

/// Validate an ISBN-10 or ISBN-13 and return it without separators.
pub fn normalize_isbn(raw: &str) -> AppResult<String> {
    let isbn: String = raw
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if !ISBN_SHAPE.is_match(&isbn) {
        return Err(AppError::Validation(format!("Invalid ISBN: {}", raw)));
    }

    let digits: Vec<u32> = isbn
        .chars()
        .map(|c| if c == 'X' { 10 } else { c.to_digit(10).unwrap_or(0) })
        .collect();

    let valid = if digits.len() == 10 {
        let sum: u32 = digits
            .iter()
            .enumerate()
            .map(|(i, d)| d * (10 - i as u32))
            .sum();
        sum % 11 == 0
    } else {
        let sum: u32 = digits
            .iter()
            .enumerate()
            .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
            .sum();
        sum % 10 == 0
    };

    if valid {
        Ok(isbn)
    } else {
        Err(AppError::Validation(format!("Invalid ISBN checksum: {}", raw)))
    }
}
