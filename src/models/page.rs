//! Pagination types

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{book::Book, loan::Loan};
use crate::error::{AppError, AppResult};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// Validated page request (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> AppResult<Self> {
        let page = page.unwrap_or(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);

        let mut errors = Vec::new();
        if page < 1 {
            errors.push("The parameter 'page' must be at least 1".to_string());
        }
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            errors.push(format!(
                "The parameter 'per_page' must be between 1 and {}",
                MAX_PER_PAGE
            ));
        }
        if errors.is_empty() && (page - 1).checked_mul(per_page).is_none() {
            errors.push("The parameter 'page' is too large".to_string());
        }
        if !errors.is_empty() {
            return Err(AppError::InvalidArgument(errors));
        }

        Ok(Self { page, per_page })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Paging query parameters (API)
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number (default: 1)
    pub page: Option<i64>,
    /// Records per page (default: 20)
    pub per_page: Option<i64>,
}

/// Paginated response wrapper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[aliases(BookPage = Page<Book>, LoanPage = Page<Loan>)]
pub struct Page<T> {
    /// Records on this page
    pub items: Vec<T>,
    /// Total number of matching records
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Records per page
    pub per_page: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: &PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
        }
    }

    /// Slice an already filtered, ordered collection
    pub fn slice<I>(records: I, request: &PageRequest) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let records: Vec<T> = records.into_iter().collect();
        let total = records.len() as i64;
        let items = records
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.per_page as usize)
            .collect();
        Self::new(items, total, request)
    }
}
