//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Full author model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub biography: String,
}

/// Create author request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAuthor {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub biography: Option<String>,
}

/// Update author request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAuthor {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub biography: Option<String>,
}
