//! Loans repository for PostgreSQL

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use super::{is_unique_violation, LoanRepository};
use crate::{
    error::{AppError, AppResult},
    models::{
        loan::LoanRow,
        Loan, LoanFilter, NewLoan, Page, PageRequest,
    },
};

const LOAN_SELECT: &str = r#"
    SELECT l.id, l.customer, l.customer_email, l.loan_date, l.returned,
           b.id AS book_id, b.title AS book_title, b.author AS book_author, b.isbn AS book_isbn
    FROM loans l
    JOIN books b ON b.id = l.book_id
"#;

#[derive(Clone)]
pub struct PgLoansRepository {
    pool: Pool<Postgres>,
}

impl PgLoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn already_loaned(book_id: i64) -> AppError {
        AppError::AlreadyLoaned(format!("Book {} is already loaned", book_id))
    }
}

#[async_trait]
impl LoanRepository for PgLoansRepository {
    async fn insert(&self, loan: &NewLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        // Lock the book row so concurrent loans for it are serialized
        let book_id: Option<i64> = sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(loan.book_id)
            .fetch_optional(&mut *tx)
            .await?;
        if book_id.is_none() {
            return Err(AppError::BookNotFound(format!("Book {} not found", loan.book_id)));
        }

        let active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1 AND NOT returned)",
        )
        .bind(loan.book_id)
        .fetch_one(&mut *tx)
        .await?;
        if active {
            return Err(Self::already_loaned(loan.book_id));
        }

        let loan_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO loans (book_id, customer, customer_email, loan_date, returned)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING id
            "#,
        )
        .bind(loan.book_id)
        .bind(&loan.customer)
        .bind(&loan.customer_email)
        .bind(loan.loan_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Self::already_loaned(loan.book_id)
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;

        self.find_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Loan {} vanished after insert", loan_id)))
    }

    async fn update_returned(&self, id: i64, returned: bool) -> AppResult<Loan> {
        let result = sqlx::query("UPDATE loans SET returned = $1 WHERE id = $2")
            .bind(returned)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::AlreadyLoaned(format!(
                        "Loan {} cannot be reopened while its book is loaned",
                        id
                    ))
                } else {
                    e.into()
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Loan with id {} not found", id)));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Loan>> {
        let row = sqlx::query_as::<_, LoanRow>(&format!("{} WHERE l.id = $1", LOAN_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Loan::from))
    }

    async fn exists_unreturned_for_book(&self, book_id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1 AND NOT returned)",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn exists_for_book(&self, book_id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1)")
            .bind(book_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn find_by_isbn_or_customer(&self, filter: &LoanFilter, page: &PageRequest) -> AppResult<Page<Loan>> {
        // NULL parameters compare unknown, so an absent field never matches
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM loans l
            JOIN books b ON b.id = l.book_id
            WHERE b.isbn = $1 OR l.customer = $2
            "#,
        )
        .bind(&filter.isbn)
        .bind(&filter.customer)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            "{} WHERE b.isbn = $1 OR l.customer = $2 ORDER BY l.id LIMIT $3 OFFSET $4",
            LOAN_SELECT
        ))
        .bind(&filter.isbn)
        .bind(&filter.customer)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(rows.into_iter().map(Loan::from).collect(), total, page))
    }

    async fn find_by_book(&self, book_id: i64, page: &PageRequest) -> AppResult<Page<Loan>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE book_id = $1")
            .bind(book_id)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            "{} WHERE l.book_id = $1 ORDER BY l.id LIMIT $2 OFFSET $3",
            LOAN_SELECT
        ))
        .bind(book_id)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(rows.into_iter().map(Loan::from).collect(), total, page))
    }

    async fn find_overdue_unreturned(&self, before: NaiveDate) -> AppResult<Vec<Loan>> {
        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            "{} WHERE l.loan_date < $1 AND NOT l.returned ORDER BY l.id",
            LOAN_SELECT
        ))
        .bind(before)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Loan::from).collect())
    }
}
