//! Books repository for PostgreSQL

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder, Row};

use super::{is_foreign_key_violation, is_unique_violation, like_pattern, BookRepository};
use crate::{
    error::{AppError, AppResult},
    models::{Book, BookFilter, CreateBook, Page, PageRequest},
};

const BOOK_COLUMNS: &str = "id, title, author, isbn";

#[derive(Clone)]
pub struct PgBooksRepository {
    pool: Pool<Postgres>,
}

impl PgBooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Append the WHERE clause for an example-style book filter
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    builder.push(" WHERE TRUE");
    for (column, value) in [
        ("title", &filter.title),
        ("author", &filter.author),
        ("isbn", &filter.isbn),
    ] {
        if let Some(value) = value {
            builder
                .push(" AND ")
                .push(column)
                .push(" ILIKE ")
                .push_bind(like_pattern(value));
        }
    }
}

#[async_trait]
impl BookRepository for PgBooksRepository {
    async fn save(&self, book: &CreateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books (title, author, isbn) VALUES ($1, $2, $3) RETURNING {}",
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateIsbn(format!("ISBN {} is already registered", book.isbn))
            } else {
                e.into()
            }
        })
    }

    async fn update(&self, book: &Book) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            "UPDATE books SET title = $1, author = $2 WHERE id = $3 RETURNING {}",
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book.id)))
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE isbn = $1", BOOK_COLUMNS))
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn exists_by_isbn(&self, isbn: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
            .bind(isbn)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::BookHasLoans(format!("Book {} has loans and cannot be deleted", id))
                } else {
                    e.into()
                }
            })?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    async fn find_by_example(&self, filter: &BookFilter, page: &PageRequest) -> AppResult<Page<Book>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books");
        push_filter(&mut count, filter);
        let total: i64 = count.build().fetch_one(&self.pool).await?.try_get(0)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM books", BOOK_COLUMNS));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY id LIMIT ")
            .push_bind(page.per_page)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let books = select.build_query_as::<Book>().fetch_all(&self.pool).await?;

        Ok(Page::new(books, total, page))
    }
}
