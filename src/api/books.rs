//! Catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, BookShort, CreateBook, Genre, UpdateBook},
};

use super::AuthenticatedUser;

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// List of items
    pub items: Vec<T>,
    /// Total number of items
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Search query parameters
#[derive(Deserialize, IntoParams, ToSchema)]
pub struct SearchQuery {
    pub query: String,
}

/// List books with filters, sorting and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(
        ("genre" = Option<i32>, Query, description = "Filter by genre ID"),
        ("available" = Option<String>, Query, description = "\"yes\" for available books, \"no\" for fully checked-out"),
        ("sort" = Option<String>, Query, description = "Sort key: title, author or newest"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Books per page (default: 12)")
    ),
    responses(
        (status = 200, description = "List of books", body = PaginatedResponse<BookShort>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<PaginatedResponse<BookShort>>> {
    let page = query.page.unwrap_or(1);
    let per_page = query
        .per_page
        .unwrap_or(state.config.catalog.books_per_page);

    let (books, total) = state.services.catalog.list_books(&query).await?;

    Ok(Json(PaginatedResponse {
        items: books,
        total,
        page,
        per_page,
    }))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Search books by title, author or ISBN
#[utoipa::path(
    get,
    path = "/books/search",
    tag = "books",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<BookShort>)
    )
)]
pub async fn search_books(
    State(state): State<crate::AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<BookShort>>> {
    let books = state.services.catalog.search_books(&query.query).await?;
    Ok(Json(books))
}

/// List all genres
#[utoipa::path(
    get,
    path = "/genres",
    tag = "books",
    responses(
        (status = 200, description = "List of genres", body = Vec<Genre>)
    )
)]
pub async fn list_genres(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<Genre>>> {
    let genres = state.services.catalog.list_genres().await?;
    Ok(Json(genres))
}

/// Add a new book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not an administrator"),
        (status = 409, description = "ISBN already exists")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require_admin()?;
    request.validate()?;

    let book = state.services.catalog.create_book(request).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Update an existing book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found"),
        (status = 409, description = "ISBN already exists"),
        (status = 422, description = "Total copies below copies on loan")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    claims.require_admin()?;
    request.validate()?;

    let book = state.services.catalog.update_book(id, request).await?;
    Ok(Json(book))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Copies currently on loan")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upload a cover image for a book
#[utoipa::path(
    put,
    path = "/books/{id}/cover",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Cover updated", body = Book),
        (status = 400, description = "Missing or invalid image"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn upload_cover(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> AppResult<Json<Book>> {
    claims.require_admin()?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() == Some("cover") {
            let filename = field
                .file_name()
                .map(|s| s.to_string())
                .ok_or_else(|| AppError::BadRequest("Cover file name is missing".to_string()))?;
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

            let book = state.services.catalog.set_cover(id, &filename, &data).await?;
            return Ok(Json(book));
        }
    }

    Err(AppError::BadRequest(
        "Multipart field \"cover\" is required".to_string(),
    ))
}
