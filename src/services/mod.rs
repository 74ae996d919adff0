//! Business logic services

pub mod books;
pub mod email;
pub mod loans;
pub mod scheduler;

use std::sync::Arc;

use chrono_tz::Tz;

use crate::repository::Repository;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: books::BooksService,
    pub loans: loans::LoansService,
    pub notifier: Arc<dyn email::Notifier>,
}

impl Services {
    /// Create all services with the given repository and notification gateway.
    /// `timezone` decides which calendar day counts as "today" for loans.
    pub fn new(repository: Repository, notifier: Arc<dyn email::Notifier>, timezone: Tz) -> Self {
        let books = books::BooksService::new(repository.clone());
        Self {
            loans: loans::LoansService::new(repository, books.clone(), timezone),
            books,
            notifier,
        }
    }
}
