//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        loan::LoanDetails,
        user::{RegisterUser, User},
    },
};

use super::AuthenticatedUser;

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response with JWT token
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub user: User,
}

/// Profile response for the authenticated user
#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: User,
    pub active_loans: Vec<LoanDetails>,
    pub loan_history: Vec<LoanDetails>,
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username or email already exists")
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(request): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    request.validate()?;

    let user = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in with username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, user) = state
        .services
        .users
        .authenticate(&request.username, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        user,
    }))
}

/// Get the authenticated user's profile with active loans and history
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user profile", body = ProfileResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ProfileResponse>> {
    let user = state.services.users.get_by_id(claims.user_id).await?;
    let active_loans = state
        .services
        .loans
        .get_user_loans(claims.user_id, false)
        .await?;
    let loan_history = state
        .services
        .loans
        .get_user_loans(claims.user_id, true)
        .await?;

    Ok(Json(ProfileResponse {
        user,
        active_loans,
        loan_history,
    }))
}
