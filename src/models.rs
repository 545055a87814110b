use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Availability state of a catalog entry. Derived from the loan ledger:
/// a book is `Borrowed` iff exactly one active loan references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "book_status", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookStatus {
    Available,
    Borrowed,
}

/// Loan lifecycle states. Only `Active` and `Returned` are produced by the
/// lending workflow; the remaining variants are reserved for circulation
/// desk extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "loan_status", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Active,
    Returned,
    Overdue,
    Lost,
    Damaged,
    Cancelled,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub publisher: String,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// Logical catalog identity: two entries describe the same edition when
    /// title, author and publisher match case-insensitively and the year is
    /// equal. Id and status never participate.
    #[must_use]
    pub fn same_edition(&self, other: &Book) -> bool {
        self.describes(&other.title, &other.author, other.year, &other.publisher)
    }

    #[must_use]
    pub fn describes(&self, title: &str, author: &str, year: i32, publisher: &str) -> bool {
        self.title.eq_ignore_ascii_case(title)
            && self.author.eq_ignore_ascii_case(author)
            && self.year == year
            && self.publisher.eq_ignore_ascii_case(publisher)
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == BookStatus::Available
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub logged_in: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
}

impl Loan {
    /// A loan is active iff it has no return date.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

#[derive(Debug, Deserialize)]
pub struct AddBookRequest {
    pub title: String,
    pub author: String,
    pub year: i32,
    pub publisher: String,
}

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub publisher: String,
    pub status: BookStatus,
}

impl From<Book> for BookResponse {
    fn from(b: Book) -> Self {
        BookResponse {
            id: b.id,
            title: b.title,
            author: b.author,
            year: b.year,
            publisher: b.publisher,
            status: b.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TitleQuery {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct BorrowRequest {
    pub book_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ReturnRequest {
    pub book_id: Uuid,
}

/// Outcome of a successful borrow: the new loan id plus a human-readable
/// confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct BorrowReceipt {
    pub loan_id: Uuid,
    pub due_date: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReturnReceipt {
    pub loan_id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
