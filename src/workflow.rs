use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::anyhow;
use chrono::Months;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    catalog::BookCatalog,
    directory::UserDirectory,
    errors::{AppError, AppResult},
    ledger::LoanLedger,
    models::{Book, BookStatus, BorrowReceipt, ReturnReceipt},
    utils::Clock,
};

pub const DEFAULT_MAX_BORROW_LIMIT: i64 = 5;

/// The lending state machine. This is the only component that mutates more
/// than one store per operation: borrow and return each write the ledger and
/// the catalog flag as one unit, inside a per-book critical section, with
/// explicit compensation if the second write fails.
///
/// The ledger is the source of truth; the catalog flag is a cache of "does
/// an active loan reference this book". Conflict checks therefore consult
/// the ledger, not the flag.
pub struct LendingWorkflow {
    catalog: BookCatalog,
    directory: UserDirectory,
    ledger: LoanLedger,
    clock: Arc<dyn Clock>,
    max_borrow_limit: i64,
    book_locks: StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl LendingWorkflow {
    pub fn new(
        catalog: BookCatalog,
        directory: UserDirectory,
        ledger: LoanLedger,
        clock: Arc<dyn Clock>,
        max_borrow_limit: i64,
    ) -> Self {
        Self {
            catalog,
            directory,
            ledger,
            clock,
            max_borrow_limit,
            book_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// One lock per book identity. Operations on the same book serialize;
    /// operations on disjoint books proceed in parallel.
    fn book_lock(&self, book_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = match self.book_locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks
            .entry(book_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Borrow a book for a user.
    ///
    /// Check order is part of the contract: unknown book, unknown user,
    /// ledger conflict (any holder), session, borrow limit. The ledger
    /// conflict check runs before any look at the availability flag so a
    /// flag/ledger disagreement can never hand out a second loan.
    ///
    /// # Errors
    /// `InvalidArgument` for nil ids, `NotFound`, `Conflict` when the book
    /// is already on loan or the limit is reached, `Unauthorized` without an
    /// open session.
    pub async fn borrow(&self, user_id: Uuid, book_id: Uuid) -> AppResult<BorrowReceipt> {
        info!(%user_id, %book_id, "borrow request");

        if user_id.is_nil() || book_id.is_nil() {
            error!("borrow failed, user or book id is missing");
            return Err(AppError::InvalidArgument("user or book id is missing".into()));
        }

        let lock = self.book_lock(book_id);
        let _guard = lock.lock().await;

        let Some(book) = self.catalog.find_by_id(book_id).await? else {
            error!(%book_id, "borrow failed, book not found");
            return Err(AppError::NotFound("book"));
        };

        let Some(user) = self.directory.find_by_id(user_id).await? else {
            error!(%user_id, "borrow failed, user not found");
            return Err(AppError::NotFound("user"));
        };

        if !self.ledger.find_active_by_book(book_id).await?.is_empty() {
            warn!(%book_id, title = %book.title, "borrow failed, book is already on loan");
            return Err(AppError::Conflict(format!(
                "book '{}' cannot be borrowed",
                book.title
            )));
        }

        if !user.logged_in {
            warn!(email = %user.email, "borrow failed, user is not logged in");
            return Err(AppError::Unauthorized(format!(
                "{} is not logged in",
                user.email
            )));
        }

        if self.ledger.count_active_by_user(user_id).await? >= self.max_borrow_limit {
            warn!(email = %user.email, "borrow failed, user has reached the borrowing limit");
            return Err(AppError::Conflict(format!(
                "{} has reached the maximum number of borrowed books ({})",
                user.email, self.max_borrow_limit
            )));
        }

        let loan_date = self.clock.now();
        let due_date = loan_date + Months::new(1);
        let loan = self.ledger.open(user_id, book_id, loan_date, due_date).await?;

        // Ledger first, flag second; roll the loan back if the flag write
        // cannot be applied so no reader ever observes "loan active, book
        // available" across operation boundaries.
        let flagged = self.catalog.set_status(book_id, BookStatus::Borrowed).await;
        match flagged {
            Ok(true) => {}
            Ok(false) => {
                self.rollback_open_loan(loan.id).await;
                return Err(AppError::Internal(anyhow!(
                    "book vanished while borrowing"
                )));
            }
            Err(e) => {
                self.rollback_open_loan(loan.id).await;
                return Err(e);
            }
        }

        info!(loan_id = %loan.id, title = %book.title, email = %user.email, "borrow successful");
        Ok(BorrowReceipt {
            loan_id: loan.id,
            due_date: loan.due_date,
            message: format!(
                "book '{}' borrowed successfully by {}, loan id {}",
                book.title, user.email, loan.id
            ),
        })
    }

    /// Return a borrowed book.
    ///
    /// The active-loan lookup for (user, book) doubles as the ownership
    /// check: only the borrower of record holds such a loan.
    ///
    /// # Errors
    /// `InvalidArgument` for nil ids, `NotFound`, `Conflict` when no active
    /// loan exists for this user and book.
    pub async fn return_book(&self, user_id: Uuid, book_id: Uuid) -> AppResult<ReturnReceipt> {
        info!(%user_id, %book_id, "return request");

        if user_id.is_nil() || book_id.is_nil() {
            error!("return failed, user or book id is missing");
            return Err(AppError::InvalidArgument("user or book id is missing".into()));
        }

        let lock = self.book_lock(book_id);
        let _guard = lock.lock().await;

        let Some(book) = self.catalog.find_by_id(book_id).await? else {
            error!(%book_id, "return failed, book not found");
            return Err(AppError::NotFound("book"));
        };

        let Some(user) = self.directory.find_by_id(user_id).await? else {
            error!(%user_id, "return failed, user not found");
            return Err(AppError::NotFound("user"));
        };

        let Some(loan) = self
            .ledger
            .find_active_by_user_and_book(user_id, book_id)
            .await?
        else {
            warn!(%user_id, %book_id, "return failed, no active loan for this user and book");
            return Err(AppError::Conflict(
                "no active loan for this user and book".into(),
            ));
        };

        if !self.ledger.close(loan.id, self.clock.now()).await? {
            warn!(loan_id = %loan.id, "return failed, loan is no longer active");
            return Err(AppError::Conflict(
                "no active loan for this user and book".into(),
            ));
        }

        let flagged = self.catalog.set_status(book_id, BookStatus::Available).await;
        match flagged {
            Ok(true) => {}
            Ok(false) => {
                self.rollback_closed_loan(loan.id).await;
                return Err(AppError::Internal(anyhow!(
                    "book vanished while returning"
                )));
            }
            Err(e) => {
                self.rollback_closed_loan(loan.id).await;
                return Err(e);
            }
        }

        info!(loan_id = %loan.id, title = %book.title, email = %user.email, "return successful");
        Ok(ReturnReceipt {
            loan_id: loan.id,
            message: format!(
                "book '{}' returned successfully by {}",
                book.title, user.email
            ),
        })
    }

    /// Books currently held by a user, derived from the ledger at read time.
    ///
    /// # Errors
    /// `NotFound` for an unknown user.
    pub async fn borrowed_books(&self, user_id: Uuid) -> AppResult<Vec<Book>> {
        if self.directory.find_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound("user"));
        }

        let mut books = Vec::new();
        for loan in self.ledger.find_active_by_user(user_id).await? {
            if let Some(book) = self.catalog.find_by_id(loan.book_id).await? {
                books.push(book);
            }
        }
        Ok(books)
    }

    /// Delete a member account. Lives on the workflow because it reads the
    /// ledger before mutating the directory: an account with active loans
    /// cannot go away, or the loans would reference a borrower that no
    /// longer exists.
    ///
    /// # Errors
    /// `NotFound` for an unknown email, `Unauthorized` without a session,
    /// `Conflict` while active loans remain.
    pub async fn deregister(&self, email: &str) -> AppResult<()> {
        let Some(user) = self.directory.find_by_email(email).await? else {
            return Err(AppError::NotFound("user"));
        };

        if !user.logged_in {
            warn!(email = %user.email, "cannot delete account without an open session");
            return Err(AppError::Unauthorized(format!(
                "{} must be logged in to delete the account",
                user.email
            )));
        }

        let active = self.ledger.count_active_by_user(user.id).await?;
        if active > 0 {
            warn!(email = %user.email, active, "cannot delete account with borrowed books");
            return Err(AppError::Conflict(format!(
                "cannot delete account, {active} borrowed books must be returned first"
            )));
        }

        self.directory.delete(&user.email).await?;
        info!(email = %user.email, "account deleted");
        Ok(())
    }

    async fn rollback_open_loan(&self, loan_id: Uuid) {
        if let Err(e) = self.ledger.close(loan_id, self.clock.now()).await {
            error!(%loan_id, error = %e, "failed to roll back loan after catalog write failure");
        }
    }

    async fn rollback_closed_loan(&self, loan_id: Uuid) {
        if let Err(e) = self.ledger.reopen(loan_id).await {
            error!(%loan_id, error = %e, "failed to reopen loan after catalog write failure");
        }
    }
}
