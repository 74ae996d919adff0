//! Book model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Unique across all books, never changes after creation
    pub isbn: String,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[serde(default)]
    #[validate(length(min = 1, message = "The field 'title' cannot be empty"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "The field 'author' cannot be empty"))]
    pub author: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "The field 'isbn' cannot be empty"))]
    pub isbn: String,
}

/// Update book request. Only title and author are applied.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[serde(default)]
    #[validate(length(min = 1, message = "The field 'title' cannot be empty"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "The field 'author' cannot be empty"))]
    pub author: String,
    /// Accepted for compatibility with full book payloads; ignored
    #[serde(default)]
    pub isbn: Option<String>,
}

/// Example-style filter: every present field must be contained in the
/// corresponding book field, ignoring case. Absent fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            needle
                .as_deref()
                .map_or(true, |n| haystack.to_lowercase().contains(&n.to_lowercase()))
        }

        contains(&book.title, &self.title)
            && contains(&book.author, &self.author)
            && contains(&book.isbn, &self.isbn)
    }
}

/// Book search query parameters (API)
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Case-insensitive substring of the author
    pub author: Option<String>,
    /// Case-insensitive substring of the ISBN
    pub isbn: Option<String>,
    /// Page number (default: 1)
    pub page: Option<i64>,
    /// Books per page (default: 20)
    pub per_page: Option<i64>,
}

impl BookQuery {
    pub fn filter(&self) -> BookFilter {
        BookFilter {
            title: self.title.clone(),
            author: self.author.clone(),
            isbn: self.isbn.clone(),
        }
    }
}
