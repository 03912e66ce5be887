//! Loan model and lifecycle

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::book::BookShort;
use super::user::UserShort;

/// Loan model from database.
///
/// A loan is Open while `returned` is false and terminal once returned.
/// The user/book references are nulled if the owning row is ever deleted,
/// which deletion guards only permit once the loan is Returned.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: i32,
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    pub checkout_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub returned: bool,
    pub renewed_count: i32,
}

impl Loan {
    /// Build a new Open loan for a checkout happening at `now`.
    /// The id is assigned by the database on insert.
    pub fn checkout(user_id: i32, book_id: i32, now: DateTime<Utc>, duration_days: i64) -> Self {
        Self {
            id: 0,
            user_id: Some(user_id),
            book_id: Some(book_id),
            checkout_date: now,
            due_date: now + Duration::days(duration_days),
            return_date: None,
            returned: false,
            renewed_count: 0,
        }
    }

    /// Renew an Open loan if the renewal limit has not been reached.
    /// The due date is reset to `now + days`, not extended from the previous
    /// due date, so renewing an overdue loan clears its overdue status.
    pub fn renew(&mut self, now: DateTime<Utc>, days: i64, max_renewals: i32) -> bool {
        if self.renewed_count < max_renewals && !self.returned {
            self.renewed_count += 1;
            self.due_date = now + Duration::days(days);
            true
        } else {
            false
        }
    }

    /// Mark an Open loan as returned. Returns false if already Returned.
    pub fn mark_returned(&mut self, now: DateTime<Utc>) -> bool {
        if !self.returned {
            self.returned = true;
            self.return_date = Some(now);
            true
        } else {
            false
        }
    }

    /// An Open loan past its due date is overdue. Returned loans never are,
    /// regardless of how late the return was.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.returned && now > self.due_date
    }

    /// Whole days past the due date, zero when not overdue
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        if self.is_overdue(now) {
            (now - self.due_date).num_days()
        } else {
            0
        }
    }
}

/// Loan with book (and optionally borrower) details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub checkout_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub returned: bool,
    pub renewed_count: i32,
    pub is_overdue: bool,
    pub days_overdue: i64,
    pub book: BookShort,
    pub user: Option<UserShort>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::{Book, DEFAULT_COVER};

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn book(total: i32) -> Book {
        Book {
            id: 7,
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            isbn: "9780441172719".to_string(),
            publisher: None,
            publication_year: Some(1965),
            description: None,
            cover_image: DEFAULT_COVER.to_string(),
            total_copies: total,
            available_copies: total,
            added_date: now(),
            genres: Vec::new(),
        }
    }

    #[test]
    fn checkout_sets_due_date_fourteen_days_out() {
        let t = now();
        let loan = Loan::checkout(1, 7, t, 14);
        assert_eq!(loan.due_date, t + Duration::days(14));
        assert!(!loan.returned);
        assert_eq!(loan.renewed_count, 0);
    }

    #[test]
    fn renew_succeeds_at_most_max_renewals_times() {
        let t = now();
        let mut loan = Loan::checkout(1, 7, t, 14);
        assert!(loan.renew(t, 14, 2));
        assert!(loan.renew(t, 14, 2));
        let due_before = loan.due_date;
        assert!(!loan.renew(t + Duration::days(1), 14, 2));
        assert_eq!(loan.renewed_count, 2);
        assert_eq!(loan.due_date, due_before);
    }

    // Renewal resets the clock from the renewal moment rather than extending
    // the previous due date. An overdue loan therefore stops being overdue
    // the moment it is renewed.
    #[test]
    fn renew_resets_due_date_from_now() {
        let t = now();
        let mut loan = Loan::checkout(1, 7, t, 14);
        let late = t + Duration::days(20);
        assert!(loan.is_overdue(late));
        assert!(loan.renew(late, 14, 2));
        assert_eq!(loan.due_date, late + Duration::days(14));
        assert!(!loan.is_overdue(late));
    }

    #[test]
    fn renew_fails_on_returned_loan() {
        let t = now();
        let mut loan = Loan::checkout(1, 7, t, 14);
        assert!(loan.mark_returned(t));
        assert!(!loan.renew(t, 14, 2));
        assert_eq!(loan.renewed_count, 0);
    }

    #[test]
    fn second_return_is_a_guarded_no_op() {
        let t = now();
        let mut loan = Loan::checkout(1, 7, t, 14);
        assert!(loan.mark_returned(t));
        let return_date = loan.return_date;
        assert!(!loan.mark_returned(t + Duration::days(1)));
        assert_eq!(loan.return_date, return_date);
    }

    #[test]
    fn returned_loans_are_never_overdue() {
        let t = now();
        let mut loan = Loan::checkout(1, 7, t, 14);
        loan.mark_returned(t + Duration::days(30));
        assert!(!loan.is_overdue(t + Duration::days(30)));
        assert_eq!(loan.days_overdue(t + Duration::days(30)), 0);
    }

    #[test]
    fn days_overdue_counts_whole_days() {
        let t = now();
        let loan = Loan::checkout(1, 7, t, 14);
        assert_eq!(loan.days_overdue(t + Duration::days(14)), 0);
        assert_eq!(loan.days_overdue(t + Duration::days(17)), 3);
    }

    // Book(total=2) checked out twice, a third checkout is refused, then
    // one return frees a copy.
    #[test]
    fn two_copy_checkout_scenario() {
        let t = now();
        let mut b = book(2);

        assert!(b.is_available());
        assert!(b.reduce_available_copies());
        let loan_a = Loan::checkout(1, b.id, t, 14);
        assert_eq!(b.available_copies, 1);

        assert!(b.reduce_available_copies());
        let _loan_b = Loan::checkout(2, b.id, t, 14);
        assert_eq!(b.available_copies, 0);

        // userC cannot check out
        assert!(!b.is_available());
        assert!(!b.reduce_available_copies());
        assert_eq!(b.available_copies, 0);

        // userA returns
        let mut loan_a = loan_a;
        assert!(loan_a.mark_returned(t + Duration::days(3)));
        assert!(b.increase_available_copies());
        assert_eq!(b.available_copies, 1);
    }
}
