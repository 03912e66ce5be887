//! Book and genre models and related types

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Cover filename used when a book has no uploaded cover. Never deleted.
pub const DEFAULT_COVER: &str = "default_cover.jpg";

/// ISBN-10, ISBN-13, or hyphen-formatted ISBN-13.
static ISBN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{13}|\d{10}|[\d-]{17})$").unwrap());

/// Check ISBN format (ISBN uniqueness is checked against the catalog)
pub fn is_valid_isbn(isbn: &str) -> bool {
    ISBN_RE.is_match(isbn)
}

/// Genre tag entity
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub description: Option<String>,
    pub cover_image: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub added_date: DateTime<Utc>,
    /// Genres are loaded from the junction table, not from the book row.
    #[sqlx(default)]
    #[serde(default)]
    pub genres: Vec<Genre>,
}

impl Book {
    /// Check if at least one copy of the book is available
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// Number of copies currently checked out
    pub fn copies_on_loan(&self) -> i32 {
        self.total_copies - self.available_copies
    }

    /// Reduce the number of available copies when a book is checked out
    pub fn reduce_available_copies(&mut self) -> bool {
        if self.available_copies > 0 {
            self.available_copies -= 1;
            true
        } else {
            false
        }
    }

    /// Increase the number of available copies when a book is returned
    pub fn increase_available_copies(&mut self) -> bool {
        if self.available_copies < self.total_copies {
            self.available_copies += 1;
            true
        } else {
            false
        }
    }

    /// Change the total copy count, keeping the number currently on loan.
    /// Rejected (returns false, no mutation) when the new total is below the
    /// number of copies checked out.
    pub fn set_total_copies(&mut self, new_total: i32) -> bool {
        let on_loan = self.copies_on_loan();
        if new_total < on_loan {
            false
        } else {
            self.total_copies = new_total;
            self.available_copies = new_total - on_loan;
            true
        }
    }
}

/// Short book representation for lists and loan details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookShort {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub cover_image: String,
    pub publication_year: Option<i32>,
    pub total_copies: i32,
    pub available_copies: i32,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 128, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 128, message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 10, max = 20, message = "ISBN must be 10-20 characters"))]
    pub isbn: String,
    #[validate(length(max = 128))]
    pub publisher: Option<String>,
    #[validate(range(min = 1000, max = 3000, message = "Publication year out of range"))]
    pub publication_year: Option<i32>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "At least one copy is required"))]
    pub total_copies: i32,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 128, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 128, message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 10, max = 20, message = "ISBN must be 10-20 characters"))]
    pub isbn: String,
    #[validate(length(max = 128))]
    pub publisher: Option<String>,
    #[validate(range(min = 1000, max = 3000, message = "Publication year out of range"))]
    pub publication_year: Option<i32>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "At least one copy is required"))]
    pub total_copies: i32,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
}

/// Sort keys for book listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookSort {
    Title,
    Author,
    Newest,
}

/// Book listing query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Restrict to books tagged with this genre
    pub genre: Option<i32>,
    /// "yes" for books with available copies, "no" for fully checked-out books
    pub available: Option<String>,
    pub sort: Option<BookSort>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(total: i32, available: i32) -> Book {
        Book {
            id: 1,
            title: "The Trial".to_string(),
            author: "Franz Kafka".to_string(),
            isbn: "9780805209990".to_string(),
            publisher: None,
            publication_year: Some(1925),
            description: None,
            cover_image: DEFAULT_COVER.to_string(),
            total_copies: total,
            available_copies: available,
            added_date: Utc::now(),
            genres: Vec::new(),
        }
    }

    #[test]
    fn availability_stays_within_bounds() {
        let mut b = book(2, 2);
        assert!(b.reduce_available_copies());
        assert!(b.reduce_available_copies());
        assert!(!b.reduce_available_copies());
        assert_eq!(b.available_copies, 0);

        assert!(b.increase_available_copies());
        assert!(b.increase_available_copies());
        assert!(!b.increase_available_copies());
        assert_eq!(b.available_copies, 2);
        assert!(b.available_copies <= b.total_copies);
    }

    #[test]
    fn checkout_then_return_restores_availability() {
        let mut b = book(3, 3);
        let before = b.available_copies;
        assert!(b.reduce_available_copies());
        assert!(b.increase_available_copies());
        assert_eq!(b.available_copies, before);
    }

    #[test]
    fn reduce_fails_when_no_copy_available() {
        let mut b = book(1, 0);
        assert!(!b.reduce_available_copies());
        assert_eq!(b.available_copies, 0);
    }

    #[test]
    fn total_cannot_drop_below_copies_on_loan() {
        let mut b = book(5, 2); // 3 on loan
        assert!(!b.set_total_copies(2));
        assert_eq!(b.total_copies, 5);
        assert_eq!(b.available_copies, 2);
    }

    #[test]
    fn retotal_preserves_copies_on_loan() {
        let mut b = book(5, 2); // 3 on loan
        assert!(b.set_total_copies(4));
        assert_eq!(b.total_copies, 4);
        assert_eq!(b.available_copies, 1);
        assert_eq!(b.copies_on_loan(), 3);
    }

    #[test]
    fn isbn_formats() {
        assert!(is_valid_isbn("9780805209990"));
        assert!(is_valid_isbn("0805209999"));
        assert!(is_valid_isbn("978-0-8050-9999-0"));
        assert!(!is_valid_isbn("not-an-isbn"));
        assert!(!is_valid_isbn("12345"));
    }
}
