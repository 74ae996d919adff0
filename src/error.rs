//! Error types for Biblion

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

/// Stable error codes reported to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 2,
    NoSuchData = 3,
    NoSuchBook = 4,
    DuplicateIsbn = 5,
    BookAlreadyLoaned = 6,
    BadValue = 7,
    NotificationFailure = 8,
    BookHasLoans = 9,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("Duplicate ISBN: {0}")]
    DuplicateIsbn(String),

    #[error("Book already loaned: {0}")]
    AlreadyLoaned(String),

    #[error("Book has loans: {0}")]
    BookHasLoans(String),

    #[error("Invalid argument: {}", .0.join("; "))]
    InvalidArgument(Vec<String>),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a single-message `InvalidArgument`
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidArgument(vec![message.into()])
    }

    fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData),
            AppError::BookNotFound(_) => (StatusCode::BAD_REQUEST, ErrorCode::NoSuchBook),
            AppError::DuplicateIsbn(_) => (StatusCode::BAD_REQUEST, ErrorCode::DuplicateIsbn),
            AppError::AlreadyLoaned(_) => (StatusCode::BAD_REQUEST, ErrorCode::BookAlreadyLoaned),
            AppError::BookHasLoans(_) => (StatusCode::BAD_REQUEST, ErrorCode::BookHasLoans),
            AppError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
            AppError::Notification(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::NotificationFailure)
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    /// Human-readable messages, one per problem found
    pub errors: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let errors = match self {
            AppError::NotFound(msg)
            | AppError::BookNotFound(msg)
            | AppError::DuplicateIsbn(msg)
            | AppError::AlreadyLoaned(msg)
            | AppError::BookHasLoans(msg) => vec![msg],
            AppError::InvalidArgument(messages) => messages,
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                vec!["Database error".to_string()]
            }
            AppError::Notification(msg) => {
                tracing::error!("Notification error: {}", msg);
                vec!["Notification delivery failed".to_string()]
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                vec!["Internal server error".to_string()]
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            errors,
        });

        (status, body).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, field_errors)| {
                field_errors.iter().map(move |error| match &error.message {
                    Some(message) => message.to_string(),
                    None => format!("The field '{}' is invalid", field),
                })
            })
            .collect();
        messages.sort();
        AppError::InvalidArgument(messages)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::invalid(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::invalid(rejection.body_text())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
