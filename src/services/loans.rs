//! Loan lifecycle service

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

use super::books::BooksService;
use crate::{
    error::{AppError, AppResult},
    models::{
        loan::overdue_cutoff, Book, CreateLoan, Loan, LoanFilter, NewLoan, Page, PageRequest,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    books: BooksService,
    timezone: Tz,
}

impl LoansService {
    pub fn new(repository: Repository, books: BooksService, timezone: Tz) -> Self {
        Self {
            repository,
            books,
            timezone,
        }
    }

    /// Current calendar day in the library's time zone
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Lend the book with the given ISBN, returning the new loan id
    pub async fn create(&self, loan: CreateLoan) -> AppResult<i64> {
        let book = self
            .books
            .get_by_isbn(&loan.isbn)
            .await?
            .ok_or_else(|| AppError::BookNotFound(format!("There is no book with ISBN {}", loan.isbn)))?;

        if self.repository.loans.exists_unreturned_for_book(book.id).await? {
            tracing::warn!("Rejected loan of book id={}: already loaned", book.id);
            return Err(AppError::AlreadyLoaned(format!(
                "Book with ISBN {} is already loaned",
                book.isbn
            )));
        }

        // The repository re-checks under its own lock/transaction
        let created = self
            .repository
            .loans
            .insert(&NewLoan {
                book_id: book.id,
                customer: loan.customer,
                customer_email: loan.customer_email,
                loan_date: self.today(),
            })
            .await?;

        tracing::info!("Created loan id={} for book id={}", created.id, book.id);
        Ok(created.id)
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Option<Loan>> {
        self.repository.loans.find_by_id(id).await
    }

    /// Set the returned flag of a loan. Repeating the same value is a no-op.
    pub async fn mark_returned(&self, id: i64, returned: bool) -> AppResult<Loan> {
        if self.get_by_id(id).await?.is_none() {
            return Err(AppError::NotFound(format!("There is no loan with id {}", id)));
        }

        let loan = self.repository.loans.update_returned(id, returned).await?;
        tracing::info!("Loan id={} marked returned={}", id, returned);
        Ok(loan)
    }

    /// Loans whose book ISBN or customer matches the filter (logical OR)
    pub async fn find(&self, filter: &LoanFilter, page: &PageRequest) -> AppResult<Page<Loan>> {
        self.repository.loans.find_by_isbn_or_customer(filter, page).await
    }

    /// Every loan of a book, returned or not
    pub async fn get_loans_by_book(&self, book: &Book, page: &PageRequest) -> AppResult<Page<Loan>> {
        self.repository.loans.find_by_book(book.id, page).await
    }

    pub async fn get_all_overdue_loans(&self) -> AppResult<Vec<Loan>> {
        self.overdue_loans_on(self.today()).await
    }

    /// Unreturned loans that are overdue on the given day
    pub async fn overdue_loans_on(&self, today: NaiveDate) -> AppResult<Vec<Loan>> {
        self.repository
            .loans
            .find_overdue_unreturned(overdue_cutoff(today))
            .await
    }
}
