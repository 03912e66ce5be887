//! Reporting service: read-only aggregations over the three stores.
//!
//! Every query tolerates an empty database and returns empty collections.

use sqlx::Row;

use crate::{
    api::reports::{BookLoanCount, DashboardStats, GenreBookCount, ReportsResponse, UserLoanCount},
    error::AppResult,
    models::book::BookShort,
    repository::Repository,
};

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
}

impl ReportsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Library reports: overdue loans, most-borrowed books, most-catalogued
    /// genres and most-active borrowers.
    pub async fn get_reports(&self) -> AppResult<ReportsResponse> {
        Ok(ReportsResponse {
            overdue_loans: self.repository.loans.list_overdue().await?,
            popular_books: self.popular_books(10).await?,
            popular_genres: self.popular_genres(5).await?,
            active_users: self.active_users(10).await?,
        })
    }

    /// Books ranked by total loan count (books never borrowed are omitted)
    async fn popular_books(&self, limit: i64) -> AppResult<Vec<BookLoanCount>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.title, b.author, b.isbn, b.cover_image,
                   b.publication_year, b.total_copies, b.available_copies,
                   COUNT(l.id) as loan_count
            FROM books b
            JOIN loans l ON l.book_id = b.id
            GROUP BY b.id
            ORDER BY loan_count DESC, b.title
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| BookLoanCount {
                book: BookShort {
                    id: row.get("id"),
                    title: row.get("title"),
                    author: row.get("author"),
                    isbn: row.get("isbn"),
                    cover_image: row.get("cover_image"),
                    publication_year: row.get("publication_year"),
                    total_copies: row.get("total_copies"),
                    available_copies: row.get("available_copies"),
                },
                loan_count: row.get("loan_count"),
            })
            .collect())
    }

    /// Genres ranked by how many books carry them
    async fn popular_genres(&self, limit: i64) -> AppResult<Vec<GenreBookCount>> {
        let rows = sqlx::query(
            r#"
            SELECT g.id, g.name, COUNT(bg.book_id) as book_count
            FROM genres g
            JOIN book_genres bg ON bg.genre_id = g.id
            GROUP BY g.id, g.name
            ORDER BY book_count DESC, g.name
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| GenreBookCount {
                id: row.get("id"),
                name: row.get("name"),
                book_count: row.get("book_count"),
            })
            .collect())
    }

    /// Users ranked by total loan count, open and returned alike
    async fn active_users(&self, limit: i64) -> AppResult<Vec<UserLoanCount>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.username, u.first_name, u.last_name,
                   COUNT(l.id) as loan_count
            FROM users u
            JOIN loans l ON l.user_id = u.id
            GROUP BY u.id
            ORDER BY loan_count DESC, u.username
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| UserLoanCount {
                id: row.get("id"),
                username: row.get("username"),
                first_name: row.get("first_name"),
                last_name: row.get("last_name"),
                loan_count: row.get("loan_count"),
            })
            .collect())
    }

    /// Dashboard counters and the most recently added books
    pub async fn get_dashboard(&self) -> AppResult<DashboardStats> {
        let pool = &self.repository.pool;

        let total_books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(pool)
            .await?;

        let total_genres: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM genres")
            .fetch_one(pool)
            .await?;

        let books_on_loan: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM books WHERE available_copies < total_copies",
        )
        .fetch_one(pool)
        .await?;

        let recent_books = sqlx::query_as::<_, BookShort>(
            r#"
            SELECT id, title, author, isbn, cover_image,
                   publication_year, total_copies, available_copies
            FROM books
            ORDER BY added_date DESC
            LIMIT 8
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(DashboardStats {
            total_books,
            total_genres,
            books_on_loan,
            active_loans: self.repository.loans.count_active().await?,
            overdue_loans: self.repository.loans.count_overdue().await?,
            recent_books,
        })
    }
}
