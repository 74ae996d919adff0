//! Loan model and related types

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::book::Book;

/// Number of days a book may stay out before its loan is overdue
pub const MAX_LOAN_DAYS: i64 = 4;

/// Loans dated strictly before the returned day are overdue on `today`
pub fn overdue_cutoff(today: NaiveDate) -> NaiveDate {
    today - Duration::days(MAX_LOAN_DAYS)
}

/// Loan with the book it references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Loan {
    pub id: i64,
    pub book: Book,
    pub customer: String,
    pub customer_email: String,
    pub loan_date: NaiveDate,
    pub returned: bool,
}

impl Loan {
    /// Unreturned and dated before `cutoff` (see [`overdue_cutoff`])
    pub fn is_overdue(&self, cutoff: NaiveDate) -> bool {
        !self.returned && self.loan_date < cutoff
    }
}

/// Loan joined with its book, as read from the database
#[derive(Debug, Clone, FromRow)]
pub struct LoanRow {
    pub id: i64,
    pub customer: String,
    pub customer_email: String,
    pub loan_date: NaiveDate,
    pub returned: bool,
    pub book_id: i64,
    pub book_title: String,
    pub book_author: String,
    pub book_isbn: String,
}

impl From<LoanRow> for Loan {
    fn from(row: LoanRow) -> Self {
        Self {
            id: row.id,
            book: Book {
                id: row.book_id,
                title: row.book_title,
                author: row.book_author,
                isbn: row.book_isbn,
            },
            customer: row.customer,
            customer_email: row.customer_email,
            loan_date: row.loan_date,
            returned: row.returned,
        }
    }
}

/// Loan about to be persisted
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub book_id: i64,
    pub customer: String,
    pub customer_email: String,
    pub loan_date: NaiveDate,
}

/// Create loan request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLoan {
    /// ISBN of the book to borrow
    #[serde(default)]
    #[validate(length(min = 1, message = "The field 'isbn' cannot be empty"))]
    pub isbn: String,
    /// Customer name
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "The field 'customer' must be between 1 and 100 characters"
    ))]
    pub customer: String,
    /// Address overdue notices are sent to
    #[serde(default)]
    #[validate(email(message = "The field 'customer_email' must be a valid email address"))]
    pub customer_email: String,
}

/// Loan return request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReturnLoan {
    pub returned: bool,
}

/// Created loan identifier
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoanCreated {
    pub id: i64,
}

/// Loan search filter. A loan matches when its book ISBN equals `isbn`
/// OR its customer equals `customer`; absent fields never match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanFilter {
    pub isbn: Option<String>,
    pub customer: Option<String>,
}

impl LoanFilter {
    pub fn matches(&self, loan: &Loan) -> bool {
        self.isbn.as_deref() == Some(loan.book.isbn.as_str())
            || self.customer.as_deref() == Some(loan.customer.as_str())
    }
}

/// Loan search query parameters (API)
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    /// Exact ISBN of the borrowed book
    pub isbn: Option<String>,
    /// Exact customer name
    pub customer: Option<String>,
    /// Page number (default: 1)
    pub page: Option<i64>,
    /// Loans per page (default: 20)
    pub per_page: Option<i64>,
}

impl LoanQuery {
    pub fn filter(&self) -> LoanFilter {
        LoanFilter {
            isbn: self.isbn.clone(),
            customer: self.customer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan(customer: &str, isbn: &str, loan_date: NaiveDate, returned: bool) -> Loan {
        Loan {
            id: 1,
            book: Book {
                id: 1,
                title: "Clean Code".to_string(),
                author: "Martin".to_string(),
                isbn: isbn.to_string(),
            },
            customer: customer.to_string(),
            customer_email: "customer@example.com".to_string(),
            loan_date,
            returned,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn overdue_starts_after_four_full_days() {
        let cutoff = overdue_cutoff(date(2024, 3, 10));
        assert!(!loan("Alice", "111", date(2024, 3, 6), false).is_overdue(cutoff));
        assert!(loan("Alice", "111", date(2024, 3, 5), false).is_overdue(cutoff));
    }

    #[test]
    fn returned_loans_are_never_overdue() {
        let cutoff = overdue_cutoff(date(2024, 3, 10));
        assert!(!loan("Alice", "111", date(2024, 1, 1), true).is_overdue(cutoff));
    }

    #[test]
    fn filter_uses_or_between_fields() {
        let filter = LoanFilter {
            isbn: Some("111".to_string()),
            customer: Some("Alice".to_string()),
        };
        let today = date(2024, 3, 10);
        assert!(filter.matches(&loan("Bob", "111", today, false)));
        assert!(filter.matches(&loan("Alice", "222", today, false)));
        assert!(!filter.matches(&loan("Bob", "222", today, false)));
    }

    #[test]
    fn empty_filter_matches_nothing() {
        let today = date(2024, 3, 10);
        assert!(!LoanFilter::default().matches(&loan("Alice", "111", today, false)));
    }
}
