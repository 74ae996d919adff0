//! Biblion Library Loans Service
//!
//! A REST JSON API for a small library: book catalog management, loan
//! tracking with one active loan per book, and a daily job that emails
//! customers whose loans are overdue.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
