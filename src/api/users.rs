//! User management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{UpdateUser, User, UserQuery, UserShort},
};

use super::{books::PaginatedResponse, AuthenticatedUser};

/// List users with search and pagination (admin only)
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("query" = Option<String>, Query, description = "Search by username, email or name"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Users per page")
    ),
    responses(
        (status = 200, description = "List of users", body = PaginatedResponse<UserShort>),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<PaginatedResponse<UserShort>>> {
    claims.require_admin()?;

    let (users, total) = state.services.users.search_users(&query).await?;

    Ok(Json(PaginatedResponse {
        items: users,
        total,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }))
}

/// Get user details by ID (admin or the user themselves)
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<User>> {
    claims.require_self_or_admin(id)?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(user))
}

/// Update a user (admin or the user themselves; the admin flag only
/// changes for admin callers)
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn update_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateUser>,
) -> AppResult<Json<User>> {
    claims.require_self_or_admin(id)?;
    request.validate()?;

    let user = state
        .services
        .users
        .update_user(id, request, claims.is_admin)
        .await?;
    Ok(Json(user))
}

/// Delete a user (admin only, never the caller's own account)
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "User not found"),
        (status = 422, description = "User has open loans or is the caller")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state
        .services
        .users
        .delete_user(id, claims.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
