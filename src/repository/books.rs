//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, BookShort, BookSort, CreateBook, Genre, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID with its genres
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let mut book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        book.genres = self.get_book_genres(id).await?;
        Ok(book)
    }

    /// Load all genres for a book via the junction table
    async fn get_book_genres(&self, book_id: i32) -> AppResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>(
            r#"
            SELECT g.id, g.name
            FROM book_genres bg
            JOIN genres g ON g.id = bg.genre_id
            WHERE bg.book_id = $1
            ORDER BY g.name
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(genres)
    }

    /// List all genres alphabetically
    pub async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(genres)
    }

    /// Check if another book already uses this ISBN
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND id != $2)")
                .bind(isbn)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
                .bind(isbn)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// List books with genre/availability filters, sorting and pagination
    pub async fn list(
        &self,
        query: &BookQuery,
        default_per_page: i64,
    ) -> AppResult<(Vec<BookShort>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(default_per_page).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut conditions = vec!["1=1".to_string()];

        if let Some(genre_id) = query.genre {
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM book_genres bg WHERE bg.book_id = b.id AND bg.genre_id = {})",
                genre_id
            ));
        }

        match query.available.as_deref() {
            Some("yes") => conditions.push("b.available_copies > 0".to_string()),
            Some("no") => conditions.push("b.available_copies = 0".to_string()),
            _ => {}
        }

        let order_by = match query.sort.unwrap_or(BookSort::Title) {
            BookSort::Title => "b.title ASC",
            BookSort::Author => "b.author ASC",
            BookSort::Newest => "b.added_date DESC",
        };

        let where_clause = conditions.join(" AND ");

        let count_query = format!("SELECT COUNT(*) FROM books b WHERE {}", where_clause);
        let total: i64 = sqlx::query_scalar(&count_query)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            r#"
            SELECT b.id, b.title, b.author, b.isbn, b.cover_image,
                   b.publication_year, b.total_copies, b.available_copies
            FROM books b
            WHERE {}
            ORDER BY {}
            LIMIT {} OFFSET {}
            "#,
            where_clause, order_by, per_page, offset
        );

        let books = sqlx::query_as::<_, BookShort>(&select_query)
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }

    /// Substring search over title, author and ISBN
    pub async fn search(&self, term: &str) -> AppResult<Vec<BookShort>> {
        let pattern = format!("%{}%", term);
        let books = sqlx::query_as::<_, BookShort>(
            r#"
            SELECT id, title, author, isbn, cover_image,
                   publication_year, total_copies, available_copies
            FROM books
            WHERE title ILIKE $1 OR author ILIKE $1 OR isbn ILIKE $1
            ORDER BY title
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Create a new book with its genre associations.
    /// All copies start available.
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (
                title, author, isbn, publisher, publication_year,
                description, total_copies, available_copies
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(&book.description)
        .bind(book.total_copies)
        .fetch_one(&mut *tx)
        .await?;

        if !book.genre_ids.is_empty() {
            sqlx::query(
                "INSERT INTO book_genres (book_id, genre_id)
                 SELECT $1, id FROM genres WHERE id = ANY($2)",
            )
            .bind(id)
            .bind(&book.genre_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Update a book. The total copy count may only grow or shrink down to
    /// the number of copies currently on loan; available_copies is recomputed
    /// to preserve the on-loan count.
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(i32, i32)> = sqlx::query_as(
            "SELECT total_copies, available_copies FROM books WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let (total, available) =
            row.ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let on_loan = total - available;
        if book.total_copies < on_loan {
            return Err(AppError::BusinessRule(
                "Cannot reduce total copies below the number currently on loan".to_string(),
            ));
        }
        let new_available = book.total_copies - on_loan;

        sqlx::query(
            r#"
            UPDATE books
            SET title = $1, author = $2, isbn = $3, publisher = $4,
                publication_year = $5, description = $6,
                total_copies = $7, available_copies = $8
            WHERE id = $9
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(&book.description)
        .bind(book.total_copies)
        .bind(new_available)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        // Replace the genre set
        sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if !book.genre_ids.is_empty() {
            sqlx::query(
                "INSERT INTO book_genres (book_id, genre_id)
                 SELECT $1, id FROM genres WHERE id = ANY($2)",
            )
            .bind(id)
            .bind(&book.genre_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Replace the cover filename, returning the previous one for cleanup
    pub async fn update_cover(&self, id: i32, filename: &str) -> AppResult<String> {
        let mut tx = self.pool.begin().await?;

        let old: Option<String> =
            sqlx::query_scalar("SELECT cover_image FROM books WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let old =
            old.ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        sqlx::query("UPDATE books SET cover_image = $1 WHERE id = $2")
            .bind(filename)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(old)
    }

    /// Delete a book, rejected while any copy is on loan.
    /// Returns the cover filename so the caller can clean the file up.
    pub async fn delete(&self, id: i32) -> AppResult<String> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(i32, i32, String)> = sqlx::query_as(
            "SELECT total_copies, available_copies, cover_image FROM books WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let (total, available, cover) =
            row.ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        if available < total {
            return Err(AppError::BusinessRule(
                "Cannot delete book while copies are on loan".to_string(),
            ));
        }

        // Junction rows cascade; historical loans keep their row with the
        // book reference nulled.
        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(cover)
    }
}
