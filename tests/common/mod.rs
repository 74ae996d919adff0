//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use chrono::NaiveDate;
use chrono_tz::Tz;

use biblion::{
    api,
    config::{AppConfig, StorageBackend},
    error::AppResult,
    models::{Book, CreateBook, CreateLoan, NewLoan},
    repository::Repository,
    services::{email::Notifier, Services},
    AppState,
};

/// Notifier that records every call instead of sending anything
#[derive(Default)]
pub struct RecordingNotifier {
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_messages(&self, body: &str, recipients: &[String]) -> AppResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((body.to_string(), recipients.to_vec()));
        Ok(())
    }
}

pub struct TestContext {
    pub repository: Repository,
    pub services: Services,
    pub notifier: Arc<RecordingNotifier>,
}

/// Services over a fresh in-memory store
pub fn context() -> TestContext {
    context_with(Repository::in_memory())
}

/// Services over the given repository, with a recording notifier
pub fn context_with(repository: Repository) -> TestContext {
    let notifier = Arc::new(RecordingNotifier::default());
    let services = Services::new(repository.clone(), notifier.clone(), Tz::UTC);
    TestContext {
        repository,
        services,
        notifier,
    }
}

/// Full HTTP router over a fresh in-memory store
pub fn app() -> Router {
    let mut config = AppConfig::default();
    config.database.backend = StorageBackend::Memory;

    let ctx = context();
    api::router(AppState {
        config: Arc::new(config),
        services: Arc::new(ctx.services),
    })
}

pub fn new_book(title: &str, author: &str, isbn: &str) -> CreateBook {
    CreateBook {
        title: title.to_string(),
        author: author.to_string(),
        isbn: isbn.to_string(),
    }
}

pub fn new_loan(isbn: &str, customer: &str, email: &str) -> CreateLoan {
    CreateLoan {
        isbn: isbn.to_string(),
        customer: customer.to_string(),
        customer_email: email.to_string(),
    }
}

pub async fn seed_book(ctx: &TestContext, title: &str, isbn: &str) -> Book {
    ctx.services
        .books
        .create(new_book(title, "Some Author", isbn))
        .await
        .expect("book should be created")
}

/// Insert a loan with an explicit date, bypassing the service's "today"
pub async fn seed_loan_on(
    ctx: &TestContext,
    book: &Book,
    customer: &str,
    email: &str,
    loan_date: NaiveDate,
) -> i64 {
    ctx.repository
        .loans
        .insert(&NewLoan {
            book_id: book.id,
            customer: customer.to_string(),
            customer_email: email.to_string(),
            loan_date,
        })
        .await
        .expect("loan should be inserted")
        .id
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
