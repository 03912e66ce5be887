//! Loans repository: the checkout/return/renew ledger.
//!
//! Every mutation runs inside a single transaction with the affected rows
//! locked, so the availability check and the copy-count adjustment are one
//! atomic step. Each checkout pairs with exactly one later return that
//! reverses its decrement; renewals never touch the count.

use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookShort,
        loan::{Loan, LoanDetails},
        user::UserShort,
    },
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Check out a book for a user.
    ///
    /// Requires an available copy and no existing Open loan for the
    /// (user, book) pair; creates the loan and decrements the availability
    /// in the same transaction, or changes nothing at all.
    pub async fn checkout(&self, user_id: i32, book_id: i32, duration_days: i64) -> AppResult<Loan> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Lock the book row so the availability check and the decrement
        // cannot interleave with a concurrent checkout.
        let available: Option<i32> =
            sqlx::query_scalar("SELECT available_copies FROM books WHERE id = $1 FOR UPDATE")
                .bind(book_id)
                .fetch_optional(&mut *tx)
                .await?;

        let available = available
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        if available <= 0 {
            return Err(AppError::BusinessRule(
                "This book is not available for checkout".to_string(),
            ));
        }

        // One Open loan per (user, book); enforced here, not by the schema.
        let already_borrowed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE user_id = $1 AND book_id = $2 AND NOT returned)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_borrowed {
            return Err(AppError::BusinessRule(
                "You already have this book checked out".to_string(),
            ));
        }

        let mut loan = Loan::checkout(user_id, book_id, now, duration_days);

        loan.id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO loans (user_id, book_id, checkout_date, due_date, returned, renewed_count)
            VALUES ($1, $2, $3, $4, FALSE, 0)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(loan.checkout_date)
        .bind(loan.due_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET available_copies = available_copies - 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Lock the caller's Open loan for a book, distinguishing "already
    /// returned" from "never borrowed" when there is none.
    async fn lock_open_loan(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        user_id: i32,
        book_id: i32,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE user_id = $1 AND book_id = $2 AND NOT returned FOR UPDATE",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&mut **tx)
        .await?;

        match loan {
            Some(loan) => Ok(loan),
            None => {
                let was_returned: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM loans WHERE user_id = $1 AND book_id = $2 AND returned)",
                )
                .bind(user_id)
                .bind(book_id)
                .fetch_one(&mut **tx)
                .await?;

                if was_returned {
                    Err(AppError::BusinessRule("Loan already returned".to_string()))
                } else {
                    Err(AppError::NotFound(
                        "No open loan found for this book".to_string(),
                    ))
                }
            }
        }
    }

    /// Return the caller's Open loan for a book.
    ///
    /// Marks the loan Returned and increments the book's availability in the
    /// same transaction. A second return attempt changes nothing and is
    /// reported as already returned.
    pub async fn return_book(&self, user_id: i32, book_id: i32) -> AppResult<Loan> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut loan = Self::lock_open_loan(&mut tx, user_id, book_id).await?;
        loan.mark_returned(now);

        sqlx::query("UPDATE loans SET returned = TRUE, return_date = $1 WHERE id = $2")
            .bind(now)
            .bind(loan.id)
            .execute(&mut *tx)
            .await?;

        // The paired increment for this loan's checkout decrement. The
        // Open-loan precondition keeps this from ever exceeding total_copies.
        sqlx::query("UPDATE books SET available_copies = available_copies + 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Renew the caller's Open loan for a book.
    ///
    /// The due date resets to now + duration; renewal never touches the
    /// availability count. Fails once the renewal limit is reached, leaving
    /// the loan untouched.
    pub async fn renew(
        &self,
        user_id: i32,
        book_id: i32,
        duration_days: i64,
        max_renewals: i32,
    ) -> AppResult<Loan> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut loan = Self::lock_open_loan(&mut tx, user_id, book_id).await?;

        if !loan.renew(now, duration_days, max_renewals) {
            return Err(AppError::BusinessRule(format!(
                "Renewal limit reached ({}/{})",
                loan.renewed_count, max_renewals
            )));
        }

        sqlx::query("UPDATE loans SET due_date = $1, renewed_count = $2 WHERE id = $3")
            .bind(loan.due_date)
            .bind(loan.renewed_count)
            .bind(loan.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Get loans for a user: open loans ordered by due date, or the full
    /// history ordered by most recent checkout.
    pub async fn get_user_loans(
        &self,
        user_id: i32,
        include_history: bool,
    ) -> AppResult<Vec<LoanDetails>> {
        let query = if include_history {
            r#"
            SELECT l.*, b.id as b_id, b.title, b.author, b.isbn, b.cover_image,
                   b.publication_year, b.total_copies, b.available_copies
            FROM loans l
            JOIN books b ON l.book_id = b.id
            WHERE l.user_id = $1
            ORDER BY l.checkout_date DESC
            "#
        } else {
            r#"
            SELECT l.*, b.id as b_id, b.title, b.author, b.isbn, b.cover_image,
                   b.publication_year, b.total_copies, b.available_copies
            FROM loans l
            JOIN books b ON l.book_id = b.id
            WHERE l.user_id = $1 AND NOT l.returned
            ORDER BY l.due_date
            "#
        };

        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| details_from_row(row, false)).collect())
    }

    /// All Open loans past their due date, oldest due first, with borrower
    /// details. Empty when nothing is overdue.
    pub async fn list_overdue(&self) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT l.*, b.id as b_id, b.title, b.author, b.isbn, b.cover_image,
                   b.publication_year, b.total_copies, b.available_copies,
                   u.id as u_id, u.username, u.first_name, u.last_name, u.is_admin
            FROM loans l
            JOIN books b ON l.book_id = b.id
            JOIN users u ON l.user_id = u.id
            WHERE NOT l.returned AND l.due_date < NOW()
            ORDER BY l.due_date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| details_from_row(row, true)).collect())
    }

    /// Count open loans
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE NOT returned")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Count overdue loans
    pub async fn count_overdue(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE NOT returned AND due_date < NOW()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

/// Map a loan row joined with its book (and optionally borrower) columns
fn details_from_row(row: &PgRow, with_user: bool) -> LoanDetails {
    let now = Utc::now();
    let loan = Loan {
        id: row.get("id"),
        user_id: row.get("user_id"),
        book_id: row.get("book_id"),
        checkout_date: row.get("checkout_date"),
        due_date: row.get("due_date"),
        return_date: row.get("return_date"),
        returned: row.get("returned"),
        renewed_count: row.get("renewed_count"),
    };

    let user = if with_user {
        Some(UserShort {
            id: row.get("u_id"),
            username: row.get("username"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            is_admin: row.get("is_admin"),
            active_loans: None,
            overdue_loans: None,
        })
    } else {
        None
    };

    LoanDetails {
        id: loan.id,
        checkout_date: loan.checkout_date,
        due_date: loan.due_date,
        return_date: loan.return_date,
        returned: loan.returned,
        renewed_count: loan.renewed_count,
        is_overdue: loan.is_overdue(now),
        days_overdue: loan.days_overdue(now),
        book: BookShort {
            id: row.get("b_id"),
            title: row.get("title"),
            author: row.get("author"),
            isbn: row.get("isbn"),
            cover_image: row.get("cover_image"),
            publication_year: row.get("publication_year"),
            total_copies: row.get("total_copies"),
            available_copies: row.get("available_copies"),
        },
        user,
    }
}
