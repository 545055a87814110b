//! In-memory store implementations. Used by the behavior tests and for
//! embedding the workflow without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    errors::AppResult,
    models::{Book, BookStatus, Loan, User},
    store::{BookStore, LoanStore, UserStore},
};

#[derive(Debug, Default)]
pub struct MemoryBookStore {
    books: RwLock<HashMap<Uuid, Book>>,
}

impl MemoryBookStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn save(&self, book: Book) -> AppResult<Book> {
        self.books.write().await.insert(book.id, book.clone());
        Ok(book)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.books.read().await.get(&id).cloned())
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Vec<Book>> {
        Ok(self
            .books
            .read()
            .await
            .values()
            .filter(|b| b.title.eq_ignore_ascii_case(title))
            .cloned()
            .collect())
    }

    async fn find_available(&self) -> AppResult<Vec<Book>> {
        Ok(self
            .books
            .read()
            .await
            .values()
            .filter(|b| b.status == BookStatus::Available)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> AppResult<Vec<Book>> {
        Ok(self.books.read().await.values().cloned().collect())
    }

    async fn update_status(&self, id: Uuid, status: BookStatus) -> AppResult<bool> {
        let mut books = self.books.write().await;
        match books.get_mut(&id) {
            Some(book) => {
                book.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn save(&self, user: User) -> AppResult<User> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn set_logged_in(&self, id: Uuid, logged_in: bool) -> AppResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) => {
                user.logged_in = logged_in;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

#[derive(Debug, Default)]
pub struct MemoryLoanStore {
    loans: RwLock<HashMap<Uuid, Loan>>,
}

impl MemoryLoanStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanStore for MemoryLoanStore {
    async fn save(&self, loan: Loan) -> AppResult<Loan> {
        self.loans.write().await.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Loan>> {
        Ok(self.loans.read().await.get(&id).cloned())
    }

    async fn find_active_by_user_and_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> AppResult<Option<Loan>> {
        Ok(self
            .loans
            .read()
            .await
            .values()
            .find(|l| l.user_id == user_id && l.book_id == book_id && l.is_active())
            .cloned())
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Loan>> {
        Ok(self
            .loans
            .read()
            .await
            .values()
            .filter(|l| l.user_id == user_id && l.is_active())
            .cloned()
            .collect())
    }

    async fn find_active_by_book(&self, book_id: Uuid) -> AppResult<Vec<Loan>> {
        Ok(self
            .loans
            .read()
            .await
            .values()
            .filter(|l| l.book_id == book_id && l.is_active())
            .cloned()
            .collect())
    }

    async fn count_active_by_user(&self, user_id: Uuid) -> AppResult<i64> {
        Ok(self
            .loans
            .read()
            .await
            .values()
            .filter(|l| l.user_id == user_id && l.is_active())
            .count() as i64)
    }

    async fn update(&self, loan: &Loan) -> AppResult<bool> {
        let mut loans = self.loans.write().await;
        match loans.get_mut(&loan.id) {
            Some(existing) => {
                *existing = loan.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
