//! Loan endpoints: checkout, return and renewal, scoped to the caller

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::AppResult, models::loan::LoanDetails};

use super::AuthenticatedUser;

/// Loan response with the calculated due date
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    /// Loan ID
    pub id: i32,
    /// Due date (ISO 8601 format)
    pub due_date: DateTime<Utc>,
    /// Renewals used so far
    pub renewed_count: i32,
    /// Status message
    pub message: String,
}

/// Return response
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub status: String,
    /// Loan ID
    pub id: i32,
    /// When the book was returned
    pub return_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct MyLoansParams {
    pub history: Option<bool>,
}

/// Check out a book for the authenticated user
#[utoipa::path(
    post,
    path = "/books/{id}/checkout",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 201, description = "Book checked out", body = LoanResponse),
        (status = 404, description = "Book not found"),
        (status = 422, description = "No copy available or already checked out")
    )
)]
pub async fn checkout(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    let loan = state
        .services
        .loans
        .checkout(claims.user_id, book_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse {
            id: loan.id,
            due_date: loan.due_date,
            renewed_count: loan.renewed_count,
            message: format!(
                "Book checked out, due back on {}",
                loan.due_date.format("%B %d, %Y")
            ),
        }),
    ))
}

/// Return the authenticated user's open loan for a book
#[utoipa::path(
    post,
    path = "/books/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 404, description = "No open loan for this book"),
        (status = 422, description = "Already returned")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let loan = state
        .services
        .loans
        .return_book(claims.user_id, book_id)
        .await?;

    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        id: loan.id,
        return_date: loan.return_date,
    }))
}

/// Renew the authenticated user's open loan for a book
#[utoipa::path(
    post,
    path = "/books/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Loan renewed", body = LoanResponse),
        (status = 404, description = "No open loan for this book"),
        (status = 422, description = "Renewal limit reached or already returned")
    )
)]
pub async fn renew(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state.services.loans.renew(claims.user_id, book_id).await?;

    Ok(Json(LoanResponse {
        id: loan.id,
        due_date: loan.due_date,
        renewed_count: loan.renewed_count,
        message: format!(
            "Loan renewed ({} of {} renewals used), due back on {}",
            loan.renewed_count,
            state.services.loans.max_renewals(),
            loan.due_date.format("%B %d, %Y")
        ),
    }))
}

/// Get the authenticated user's loans
#[utoipa::path(
    get,
    path = "/loans/me",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("history" = Option<bool>, Query, description = "Include returned loans")
    ),
    responses(
        (status = 200, description = "The caller's loans", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(params): Query<MyLoansParams>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state
        .services
        .loans
        .get_user_loans(claims.user_id, params.history.unwrap_or(false))
        .await?;
    Ok(Json(loans))
}

/// Get loans for a specific user (admin or the user themselves)
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID"),
        ("history" = Option<bool>, Query, description = "Include returned loans")
    ),
    responses(
        (status = 200, description = "User's loans", body = Vec<LoanDetails>),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
    Query(params): Query<MyLoansParams>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    claims.require_self_or_admin(user_id)?;

    let loans = state
        .services
        .loans
        .get_user_loans(user_id, params.history.unwrap_or(false))
        .await?;
    Ok(Json(loans))
}
