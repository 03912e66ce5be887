//! Catalog management service

use crate::{
    config::CatalogConfig,
    error::{AppError, AppResult},
    models::book::{self, Book, BookQuery, BookShort, CreateBook, Genre, UpdateBook},
    repository::Repository,
    services::covers::CoversService,
};

fn ensure_isbn_format(isbn: &str) -> AppResult<()> {
    if book::is_valid_isbn(isbn) {
        Ok(())
    } else {
        Err(AppError::Validation(
            "ISBN must be 10 or 13 digits, or formatted with hyphens".to_string(),
        ))
    }
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    covers: CoversService,
    config: CatalogConfig,
}

impl CatalogService {
    pub fn new(repository: Repository, config: CatalogConfig) -> Self {
        Self {
            covers: CoversService::new(&config),
            repository,
            config,
        }
    }

    /// List books with filters and pagination
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<(Vec<BookShort>, i64)> {
        self.repository
            .books
            .list(query, self.config.books_per_page)
            .await
    }

    /// Substring search over title, author and ISBN.
    /// An empty query yields an empty result, not the whole catalog.
    pub async fn search_books(&self, term: &str) -> AppResult<Vec<BookShort>> {
        if term.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.repository.books.search(term.trim()).await
    }

    /// Get book by ID with full details
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// List all genres
    pub async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        self.repository.books.list_genres().await
    }

    /// Create a new book, rejecting malformed and duplicate ISBNs
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        ensure_isbn_format(&book.isbn)?;

        if self.repository.books.isbn_exists(&book.isbn, None).await? {
            return Err(AppError::Conflict(
                "A book with this ISBN already exists".to_string(),
            ));
        }

        self.repository.books.create(&book).await
    }

    /// Update a book. ISBN uniqueness excludes the book itself; the copy
    /// retotal guard lives in the repository, inside the update transaction.
    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<Book> {
        ensure_isbn_format(&book.isbn)?;

        if self.repository.books.isbn_exists(&book.isbn, Some(id)).await? {
            return Err(AppError::Conflict(
                "A book with this ISBN already exists".to_string(),
            ));
        }

        self.repository.books.update(id, &book).await
    }

    /// Delete a book and clean up its cover file. Rejected while copies are
    /// on loan; the file removal is allowed to fail without undoing the
    /// delete.
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        let cover = self.repository.books.delete(id).await?;
        self.covers.remove_best_effort(&cover).await;
        Ok(())
    }

    /// Store an uploaded cover and attach it to the book, cleaning up the
    /// replaced file best-effort.
    pub async fn set_cover(&self, id: i32, original_name: &str, data: &[u8]) -> AppResult<Book> {
        // Make sure the book exists before writing anything to disk
        self.repository.books.get_by_id(id).await?;

        let filename = self.covers.store(original_name, data).await?;
        let old = self.repository.books.update_cover(id, &filename).await?;
        self.covers.remove_best_effort(&old).await;

        self.repository.books.get_by_id(id).await
    }
}
