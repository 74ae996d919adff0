//! In-memory persistence gateway
//!
//! Books and loans share one store behind a single async mutex, so every
//! check-then-write sequence below runs under the same guard.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use super::{BookRepository, LoanRepository};
use crate::{
    error::{AppError, AppResult},
    models::{Book, BookFilter, CreateBook, Loan, LoanFilter, NewLoan, Page, PageRequest},
};

#[derive(Debug, Clone)]
struct StoredLoan {
    id: i64,
    book_id: i64,
    customer: String,
    customer_email: String,
    loan_date: NaiveDate,
    returned: bool,
}

#[derive(Debug, Default)]
struct Store {
    books: BTreeMap<i64, Book>,
    loans: BTreeMap<i64, StoredLoan>,
    last_book_id: i64,
    last_loan_id: i64,
}

impl Store {
    fn has_active_loan(&self, book_id: i64, except: Option<i64>) -> bool {
        self.loans
            .values()
            .any(|l| l.book_id == book_id && !l.returned && Some(l.id) != except)
    }

    fn hydrate(&self, loan: &StoredLoan) -> AppResult<Loan> {
        let book = self.books.get(&loan.book_id).cloned().ok_or_else(|| {
            AppError::Internal(format!("Loan {} references missing book {}", loan.id, loan.book_id))
        })?;
        Ok(Loan {
            id: loan.id,
            book,
            customer: loan.customer.clone(),
            customer_email: loan.customer_email.clone(),
            loan_date: loan.loan_date,
            returned: loan.returned,
        })
    }

    fn loans_where<F>(&self, predicate: F) -> AppResult<Vec<Loan>>
    where
        F: Fn(&Loan) -> bool,
    {
        let mut loans = Vec::new();
        for stored in self.loans.values() {
            let loan = self.hydrate(stored)?;
            if predicate(&loan) {
                loans.push(loan);
            }
        }
        Ok(loans)
    }
}

/// Shared in-memory storage for books and loans
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Store>>,
}

#[derive(Clone)]
pub struct MemoryBooksRepository {
    store: MemoryStore,
}

impl MemoryBooksRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[derive(Clone)]
pub struct MemoryLoansRepository {
    store: MemoryStore,
}

impl MemoryLoansRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BookRepository for MemoryBooksRepository {
    async fn save(&self, book: &CreateBook) -> AppResult<Book> {
        let mut store = self.store.inner.lock().await;
        if store.books.values().any(|b| b.isbn == book.isbn) {
            return Err(AppError::DuplicateIsbn(format!(
                "ISBN {} is already registered",
                book.isbn
            )));
        }

        store.last_book_id += 1;
        let created = Book {
            id: store.last_book_id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
        };
        store.books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, book: &Book) -> AppResult<Book> {
        let mut store = self.store.inner.lock().await;
        let stored = store
            .books
            .get_mut(&book.id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book.id)))?;
        stored.title = book.title.clone();
        stored.author = book.author.clone();
        Ok(stored.clone())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Book>> {
        Ok(self.store.inner.lock().await.books.get(&id).cloned())
    }

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let store = self.store.inner.lock().await;
        Ok(store.books.values().find(|b| b.isbn == isbn).cloned())
    }

    async fn exists_by_isbn(&self, isbn: &str) -> AppResult<bool> {
        let store = self.store.inner.lock().await;
        Ok(store.books.values().any(|b| b.isbn == isbn))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut store = self.store.inner.lock().await;
        if !store.books.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        if store.loans.values().any(|loan| loan.book_id == id) {
            return Err(AppError::BookHasLoans(format!(
                "Book {} has loans and cannot be deleted",
                id
            )));
        }
        store.books.remove(&id);
        Ok(())
    }

    async fn find_by_example(&self, filter: &BookFilter, page: &PageRequest) -> AppResult<Page<Book>> {
        let store = self.store.inner.lock().await;
        let books = store.books.values().filter(|b| filter.matches(b)).cloned();
        Ok(Page::slice(books, page))
    }
}

#[async_trait]
impl LoanRepository for MemoryLoansRepository {
    async fn insert(&self, loan: &NewLoan) -> AppResult<Loan> {
        let mut store = self.store.inner.lock().await;
        if !store.books.contains_key(&loan.book_id) {
            return Err(AppError::BookNotFound(format!("Book {} not found", loan.book_id)));
        }
        if store.has_active_loan(loan.book_id, None) {
            return Err(AppError::AlreadyLoaned(format!(
                "Book {} is already loaned",
                loan.book_id
            )));
        }

        store.last_loan_id += 1;
        let stored = StoredLoan {
            id: store.last_loan_id,
            book_id: loan.book_id,
            customer: loan.customer.clone(),
            customer_email: loan.customer_email.clone(),
            loan_date: loan.loan_date,
            returned: false,
        };
        let created = store.hydrate(&stored)?;
        store.loans.insert(stored.id, stored);
        Ok(created)
    }

    async fn update_returned(&self, id: i64, returned: bool) -> AppResult<Loan> {
        let mut store = self.store.inner.lock().await;
        let book_id = store
            .loans
            .get(&id)
            .map(|l| l.book_id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        if !returned && store.has_active_loan(book_id, Some(id)) {
            return Err(AppError::AlreadyLoaned(format!(
                "Loan {} cannot be reopened while its book is loaned",
                id
            )));
        }

        let stored = store
            .loans
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;
        stored.returned = returned;
        let stored = stored.clone();
        store.hydrate(&stored)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Loan>> {
        let store = self.store.inner.lock().await;
        store.loans.get(&id).map(|l| store.hydrate(l)).transpose()
    }

    async fn exists_unreturned_for_book(&self, book_id: i64) -> AppResult<bool> {
        Ok(self.store.inner.lock().await.has_active_loan(book_id, None))
    }

    async fn exists_for_book(&self, book_id: i64) -> AppResult<bool> {
        let store = self.store.inner.lock().await;
        Ok(store.loans.values().any(|l| l.book_id == book_id))
    }

    async fn find_by_isbn_or_customer(&self, filter: &LoanFilter, page: &PageRequest) -> AppResult<Page<Loan>> {
        let store = self.store.inner.lock().await;
        let loans = store.loans_where(|l| filter.matches(l))?;
        Ok(Page::slice(loans, page))
    }

    async fn find_by_book(&self, book_id: i64, page: &PageRequest) -> AppResult<Page<Loan>> {
        let store = self.store.inner.lock().await;
        let loans = store.loans_where(|l| l.book.id == book_id)?;
        Ok(Page::slice(loans, page))
    }

    async fn find_overdue_unreturned(&self, before: NaiveDate) -> AppResult<Vec<Loan>> {
        let store = self.store.inner.lock().await;
        store.loans_where(|l| l.is_overdue(before))
    }
}
