//! Loan management endpoints

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
        loan::{LoanCreated, LoanQuery},
        CreateLoan, Loan, LoanPage, PageRequest, ReturnLoan,
    },
    AppState,
};

/// Search loans by book ISBN or customer
///
/// A loan is listed when its book ISBN equals `isbn` OR its customer equals
/// `customer`. Without either parameter nothing matches.
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(LoanQuery),
    responses(
        (status = 200, description = "Matching loans", body = LoanPage),
        (status = 400, description = "Invalid paging parameters", body = crate::error::ErrorResponse)
    )
)]
pub async fn find_loans(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<LoanQuery>, AppError>,
) -> AppResult<Json<LoanPage>> {
    let page = PageRequest::new(query.page, query.per_page)?;
    let loans = state.services.loans.find(&query.filter(), &page).await?;
    Ok(Json(loans))
}

/// Get loan details by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i64, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = Loan),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<Loan>> {
    state
        .services
        .loans
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("There is no loan with id {}", id)))
}

/// Lend a book to a customer
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanCreated),
        (status = 400, description = "Invalid input, unknown ISBN or book already loaned", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<CreateLoan>, AppError>,
) -> AppResult<(StatusCode, Json<LoanCreated>)> {
    request.validate()?;

    let id = state.services.loans.create(request).await?;
    Ok((StatusCode::CREATED, Json(LoanCreated { id })))
}

/// Mark a loan as returned (or not returned)
#[utoipa::path(
    patch,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i64, Path, description = "Loan ID")
    ),
    request_body = ReturnLoan,
    responses(
        (status = 200, description = "Loan updated", body = Loan),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<ReturnLoan>, AppError>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.mark_returned(id, request.returned).await?;
    Ok(Json(loan))
}
