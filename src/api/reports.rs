//! Reporting endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{book::BookShort, loan::LoanDetails},
};

use super::AuthenticatedUser;

/// A book with its total loan count
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookLoanCount {
    pub book: BookShort,
    pub loan_count: i64,
}

/// A genre with the number of books carrying it
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenreBookCount {
    pub id: i32,
    pub name: String,
    pub book_count: i64,
}

/// A user with their total loan count
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserLoanCount {
    pub id: i32,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub loan_count: i64,
}

/// Library reports
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportsResponse {
    /// Open loans past their due date, oldest first
    pub overdue_loans: Vec<LoanDetails>,
    /// Top 10 books by loan count
    pub popular_books: Vec<BookLoanCount>,
    /// Top 5 genres by catalogued book count
    pub popular_genres: Vec<GenreBookCount>,
    /// Top 10 borrowers by loan count
    pub active_users: Vec<UserLoanCount>,
}

/// Dashboard counters and recent additions
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_books: i64,
    pub total_genres: i64,
    pub books_on_loan: i64,
    pub active_loans: i64,
    pub overdue_loans: i64,
    pub recent_books: Vec<BookShort>,
}

/// Get library reports (admin only)
#[utoipa::path(
    get,
    path = "/reports",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Library reports", body = ReportsResponse),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn get_reports(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ReportsResponse>> {
    claims.require_admin()?;

    let reports = state.services.reports.get_reports().await?;
    Ok(Json(reports))
}

/// Get dashboard statistics
#[utoipa::path(
    get,
    path = "/stats",
    tag = "reports",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats)
    )
)]
pub async fn get_stats(
    State(state): State<crate::AppState>,
) -> AppResult<Json<DashboardStats>> {
    let stats = state.services.reports.get_dashboard().await?;
    Ok(Json(stats))
}
