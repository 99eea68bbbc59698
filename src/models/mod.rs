//! Data models for the library server

pub mod author;
pub mod book;
pub mod borrow;
pub mod claim;
pub mod support;
pub mod user;

use rust_decimal::Decimal;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookShort};
pub use borrow::{Borrow, BorrowDetails, BorrowStatus};
pub use claim::{Claim, ClaimDetails, ClaimStatus, ClaimType};
pub use support::SupportMessage;
pub use user::{User, UserClaims, UserShort};

/// Normalise a money amount to two decimal places ("12.5" -> "12.50")
pub fn money(amount: Decimal) -> Decimal {
    let mut amount = amount.round_dp(2);
    amount.rescale(2);
    amount
}

/// Parse a stored money amount, falling back to zero on malformed data
pub(crate) fn parse_money(raw: &str) -> Decimal {
    raw.parse::<Decimal>().map(money).unwrap_or_else(|_| money(Decimal::ZERO))
}
