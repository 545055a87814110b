use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    errors::AppResult,
    models::{Book, BookStatus, Loan, User},
};

/// Persistence seam for catalog entries. Implementations guarantee
/// all-or-nothing semantics per call; cross-call atomicity is the lending
/// workflow's responsibility.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn save(&self, book: Book) -> AppResult<Book>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>>;
    /// Case-insensitive exact title match.
    async fn find_by_title(&self, title: &str) -> AppResult<Vec<Book>>;
    async fn find_available(&self) -> AppResult<Vec<Book>>;
    async fn find_all(&self) -> AppResult<Vec<Book>>;
    /// Returns false when no such book exists.
    async fn update_status(&self, id: Uuid, status: BookStatus) -> AppResult<bool>;
}

/// Persistence seam for members. Emails are stored normalized (trimmed,
/// lowercased); lookups expect the normalized form.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn save(&self, user: User) -> AppResult<User>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Returns false when no such user exists.
    async fn set_logged_in(&self, id: Uuid, logged_in: bool) -> AppResult<bool>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

/// Persistence seam for the loan ledger.
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn save(&self, loan: Loan) -> AppResult<Loan>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Loan>>;
    async fn find_active_by_user_and_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> AppResult<Option<Loan>>;
    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Loan>>;
    async fn find_active_by_book(&self, book_id: Uuid) -> AppResult<Vec<Loan>>;
    async fn count_active_by_user(&self, user_id: Uuid) -> AppResult<i64>;
    /// Overwrite the full record. Returns false when no such loan exists.
    async fn update(&self, loan: &Loan) -> AppResult<bool>;
}
