//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, loans, reports, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Librarium API",
        version = "1.0.0",
        description = "Library Management System REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::search_books,
        books::list_genres,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::upload_cover,
        // Users
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        // Loans
        loans::checkout,
        loans::return_book,
        loans::renew,
        loans::my_loans,
        loans::get_user_loans,
        // Reports
        reports::get_reports,
        reports::get_stats,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::ProfileResponse,
            // Books
            crate::models::book::Book,
            crate::models::book::BookShort,
            crate::models::book::Genre,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Users
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::RegisterUser,
            crate::models::user::UpdateUser,
            // Loans
            loans::LoanResponse,
            loans::ReturnResponse,
            crate::models::loan::LoanDetails,
            // Reports
            reports::ReportsResponse,
            reports::BookLoanCount,
            reports::GenreBookCount,
            reports::UserLoanCount,
            reports::DashboardStats,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "users", description = "User management"),
        (name = "loans", description = "Checkout, return and renewal"),
        (name = "reports", description = "Reports and statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
