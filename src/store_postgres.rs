//! PostgreSQL store implementations backed by a shared [`PgPool`].

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    errors::AppResult,
    models::{Book, BookStatus, Loan, LoanStatus, User},
    store::{BookStore, LoanStore, UserStore},
};

#[derive(Clone)]
pub struct PgBookStore {
    pool: PgPool,
}

impl PgBookStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for PgBookStore {
    async fn save(&self, book: Book) -> AppResult<Book> {
        let saved = sqlx::query_as::<_, Book>(
            "INSERT INTO books (id, title, author, year, publisher, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, title, author, year, publisher, status, created_at",
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.year)
        .bind(&book.publisher)
        .bind(book.status)
        .bind(book.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, year, publisher, status, created_at
             FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, year, publisher, status, created_at
             FROM books WHERE lower(title) = lower($1)",
        )
        .bind(title)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn find_available(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, year, publisher, status, created_at
             FROM books WHERE status = $1 ORDER BY created_at DESC",
        )
        .bind(BookStatus::Available)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn find_all(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, year, publisher, status, created_at
             FROM books ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn update_status(&self, id: Uuid, status: BookStatus) -> AppResult<bool> {
        let result = sqlx::query("UPDATE books SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn save(&self, user: User) -> AppResult<User> {
        let saved = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, full_name, password_hash, logged_in, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, email, full_name, password_hash, logged_in, created_at",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.logged_in)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, full_name, password_hash, logged_in, created_at
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, full_name, password_hash, logged_in, created_at
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_logged_in(&self, id: Uuid, logged_in: bool) -> AppResult<bool> {
        let result = sqlx::query("UPDATE users SET logged_in = $2 WHERE id = $1")
            .bind(id)
            .bind(logged_in)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PgLoanStore {
    pool: PgPool,
}

impl PgLoanStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanStore for PgLoanStore {
    async fn save(&self, loan: Loan) -> AppResult<Loan> {
        let saved = sqlx::query_as::<_, Loan>(
            "INSERT INTO loans (id, user_id, book_id, loan_date, due_date, return_date, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, user_id, book_id, loan_date, due_date, return_date, status",
        )
        .bind(loan.id)
        .bind(loan.user_id)
        .bind(loan.book_id)
        .bind(loan.loan_date)
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(loan.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            "SELECT id, user_id, book_id, loan_date, due_date, return_date, status
             FROM loans WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    async fn find_active_by_user_and_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            "SELECT id, user_id, book_id, loan_date, due_date, return_date, status
             FROM loans WHERE user_id = $1 AND book_id = $2 AND status = $3",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(LoanStatus::Active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT id, user_id, book_id, loan_date, due_date, return_date, status
             FROM loans WHERE user_id = $1 AND status = $2",
        )
        .bind(user_id)
        .bind(LoanStatus::Active)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn find_active_by_book(&self, book_id: Uuid) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT id, user_id, book_id, loan_date, due_date, return_date, status
             FROM loans WHERE book_id = $1 AND status = $2",
        )
        .bind(book_id)
        .bind(LoanStatus::Active)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn count_active_by_user(&self, user_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM loans WHERE user_id = $1 AND status = $2",
        )
        .bind(user_id)
        .bind(LoanStatus::Active)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn update(&self, loan: &Loan) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE loans SET loan_date = $2, due_date = $3, return_date = $4, status = $5
             WHERE id = $1",
        )
        .bind(loan.id)
        .bind(loan.loan_date)
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(loan.status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
