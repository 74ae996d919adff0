//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookQuery, page::PageQuery, Book, BookPage, CreateBook, LoanPage, PageRequest,
        UpdateBook,
    },
    AppState,
};

fn book_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Book with id {} not found", id))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<Book>> {
    state
        .services
        .books
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| book_not_found(id))
}

/// Search books by example with pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Matching books", body = BookPage),
        (status = 400, description = "Invalid paging parameters", body = crate::error::ErrorResponse)
    )
)]
pub async fn find_books(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<BookQuery>, AppError>,
) -> AppResult<Json<BookPage>> {
    let page = PageRequest::new(query.page, query.per_page)?;
    let books = state.services.books.find(&query.filter(), &page).await?;
    Ok(Json(books))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input or ISBN already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<CreateBook>, AppError>,
) -> AppResult<(StatusCode, Json<Book>)> {
    request.validate()?;

    let created = state.services.books.create(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update title and author of a book (the ISBN is never changed)
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateBook>, AppError>,
) -> AppResult<Json<Book>> {
    request.validate()?;

    let updated = state.services.books.update(id, request).await?;
    Ok(Json(updated))
}

/// Delete a book that has never been loaned
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 400, description = "Book has loans", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<StatusCode> {
    state.services.books.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List every loan of a book, returned or not
#[utoipa::path(
    get,
    path = "/books/{id}/loans",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Loans of the book", body = LoanPage),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book_loans(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, AppError>,
) -> AppResult<Json<LoanPage>> {
    let page = PageRequest::new(query.page, query.per_page)?;
    let book = state
        .services
        .books
        .get_by_id(id)
        .await?
        .ok_or_else(|| book_not_found(id))?;

    let loans = state.services.loans.get_loans_by_book(&book, &page).await?;
    Ok(Json(loans))
}
