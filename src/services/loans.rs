//! Loan management service

use crate::{
    config::LoansConfig,
    error::AppResult,
    models::loan::{Loan, LoanDetails},
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: LoansConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self { repository, config }
    }

    /// Check out a book for a user
    pub async fn checkout(&self, user_id: i32, book_id: i32) -> AppResult<Loan> {
        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;
        self.repository
            .loans
            .checkout(user_id, book_id, self.config.duration_days)
            .await
    }

    /// Return the caller's open loan for a book
    pub async fn return_book(&self, user_id: i32, book_id: i32) -> AppResult<Loan> {
        self.repository.loans.return_book(user_id, book_id).await
    }

    /// Renew the caller's open loan for a book
    pub async fn renew(&self, user_id: i32, book_id: i32) -> AppResult<Loan> {
        self.repository
            .loans
            .renew(
                user_id,
                book_id,
                self.config.duration_days,
                self.config.max_renewals,
            )
            .await
    }

    /// Get loans for a user
    pub async fn get_user_loans(
        &self,
        user_id: i32,
        include_history: bool,
    ) -> AppResult<Vec<LoanDetails>> {
        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;
        self.repository
            .loans
            .get_user_loans(user_id, include_history)
            .await
    }

    /// Maximum renewals allowed per loan, for response messages
    pub fn max_renewals(&self) -> i32 {
        self.config.max_renewals
    }
}
