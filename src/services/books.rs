//! Book catalog service

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookFilter, CreateBook, Page, PageRequest, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register a new book; the ISBN must not be in use
    pub async fn create(&self, book: CreateBook) -> AppResult<Book> {
        if self.repository.books.exists_by_isbn(&book.isbn).await? {
            tracing::warn!("Rejected book with duplicate ISBN {}", book.isbn);
            return Err(AppError::DuplicateIsbn(format!(
                "ISBN {} is already registered",
                book.isbn
            )));
        }

        let created = self.repository.books.save(&book).await?;
        tracing::info!("Created book id={} isbn={}", created.id, created.isbn);
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Option<Book>> {
        self.repository.books.find_by_id(id).await
    }

    pub async fn get_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        self.repository.books.find_by_isbn(isbn).await
    }

    /// Update title and author. The ISBN of a book never changes.
    pub async fn update(&self, id: i64, data: UpdateBook) -> AppResult<Book> {
        let mut book = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        tracing::info!("Updating book id={}", id);
        book.title = data.title;
        book.author = data.author;

        self.repository.books.update(&book).await
    }

    /// Delete a book that has never been loaned. Loan history is kept, so a
    /// book with any loan (returned or not) stays in the catalog.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if self.get_by_id(id).await?.is_none() {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        if self.repository.loans.exists_for_book(id).await? {
            tracing::warn!("Rejected deletion of book id={}: it has loans", id);
            return Err(AppError::BookHasLoans(format!(
                "Book {} has loans and cannot be deleted",
                id
            )));
        }

        tracing::info!("Deleting book id={}", id);
        self.repository.books.delete(id).await
    }

    /// Search books by example
    pub async fn find(&self, filter: &BookFilter, page: &PageRequest) -> AppResult<Page<Book>> {
        self.repository.books.find_by_example(filter, page).await
    }
}
