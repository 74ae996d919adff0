//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, loans};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblion API",
        version = "0.1.0",
        description = "Library books and loans REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        // Books
        books::find_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::get_book_loans,
        // Loans
        loans::find_loans,
        loans::get_loan,
        loans::create_loan,
        loans::return_loan,
    ),
    components(
        schemas(
            // Books
            crate::models::Book,
            crate::models::CreateBook,
            crate::models::UpdateBook,
            crate::models::BookPage,
            // Loans
            crate::models::Loan,
            crate::models::CreateLoan,
            crate::models::ReturnLoan,
            crate::models::loan::LoanCreated,
            crate::models::LoanPage,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog management"),
        (name = "loans", description = "Loan management")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
