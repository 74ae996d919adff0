//! Repository layer for book and loan persistence
//!
//! Services only see the [`BookRepository`] and [`LoanRepository`] traits.
//! Two backends implement them: PostgreSQL through sqlx, and an in-memory
//! store used for development and tests.

pub mod books;
pub mod loans;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Book, BookFilter, CreateBook, Loan, LoanFilter, NewLoan, Page, PageRequest},
};

/// Book persistence gateway
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert a new book; fails with `DuplicateIsbn` if the ISBN is taken
    async fn save(&self, book: &CreateBook) -> AppResult<Book>;
    /// Store title and author of an existing book; fails with `NotFound`
    async fn update(&self, book: &Book) -> AppResult<Book>;
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Book>>;
    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>>;
    async fn exists_by_isbn(&self, isbn: &str) -> AppResult<bool>;
    /// Remove a book; fails with `NotFound`, or `BookHasLoans` if any loan
    /// (returned or not) references it
    async fn delete(&self, id: i64) -> AppResult<()>;
    async fn find_by_example(&self, filter: &BookFilter, page: &PageRequest) -> AppResult<Page<Book>>;
}

/// Loan persistence gateway
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// Insert a new loan.
    ///
    /// The active-loan check and the insert are atomic: fails with
    /// `AlreadyLoaned` if the book has an unreturned loan, and with
    /// `BookNotFound` if the book no longer exists.
    async fn insert(&self, loan: &NewLoan) -> AppResult<Loan>;
    /// Set the returned flag; fails with `NotFound`, or `AlreadyLoaned` if
    /// reopening would leave the book with two active loans
    async fn update_returned(&self, id: i64, returned: bool) -> AppResult<Loan>;
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Loan>>;
    async fn exists_unreturned_for_book(&self, book_id: i64) -> AppResult<bool>;
    async fn exists_for_book(&self, book_id: i64) -> AppResult<bool>;
    async fn find_by_isbn_or_customer(&self, filter: &LoanFilter, page: &PageRequest) -> AppResult<Page<Loan>>;
    async fn find_by_book(&self, book_id: i64, page: &PageRequest) -> AppResult<Page<Loan>>;
    /// Unreturned loans dated strictly before `before`
    async fn find_overdue_unreturned(&self, before: NaiveDate) -> AppResult<Vec<Loan>>;
}

/// Main repository struct holding the book and loan gateways
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookRepository>,
    pub loans: Arc<dyn LoanRepository>,
}

impl Repository {
    /// Create a repository backed by the given PostgreSQL pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::PgBooksRepository::new(pool.clone())),
            loans: Arc::new(loans::PgLoansRepository::new(pool)),
        }
    }

    /// Create a repository backed by a fresh, empty in-memory store
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::default();
        Self {
            books: Arc::new(memory::MemoryBooksRepository::new(store.clone())),
            loans: Arc::new(memory::MemoryLoansRepository::new(store)),
        }
    }
}

/// Escape LIKE wildcards so user input is matched literally
pub(crate) fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// True when the error is a PostgreSQL unique constraint violation
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}
