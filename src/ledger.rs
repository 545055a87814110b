use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    errors::AppResult,
    models::{Loan, LoanStatus},
    store::LoanStore,
};

/// The authoritative, append-mostly record of all loans. The catalog's
/// availability flag is a cache of this ledger's active-loan state.
#[derive(Clone)]
pub struct LoanLedger {
    store: Arc<dyn LoanStore>,
}

impl LoanLedger {
    pub fn new(store: Arc<dyn LoanStore>) -> Self {
        Self { store }
    }

    /// Open a new active loan. The one-active-loan-per-pair and borrow-limit
    /// invariants are the orchestrator's responsibility; this always creates
    /// a record.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn open(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        loan_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let loan = Loan {
            id: Uuid::new_v4(),
            user_id,
            book_id,
            loan_date,
            due_date,
            return_date: None,
            status: LoanStatus::Active,
        };
        let saved = self.store.save(loan).await?;
        info!(loan_id = %saved.id, %user_id, %book_id, "loan opened");
        Ok(saved)
    }

    /// # Errors
    /// Propagates store failures.
    pub async fn find_by_id(&self, loan_id: Uuid) -> AppResult<Option<Loan>> {
        debug!(%loan_id, "fetching loan");
        self.store.find_by_id(loan_id).await
    }

    /// # Errors
    /// Propagates store failures.
    pub async fn find_active_by_user_and_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> AppResult<Option<Loan>> {
        debug!(%user_id, %book_id, "fetching active loan for user and book");
        self.store.find_active_by_user_and_book(user_id, book_id).await
    }

    /// # Errors
    /// Propagates store failures.
    pub async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Loan>> {
        debug!(%user_id, "fetching active loans for user");
        self.store.find_active_by_user(user_id).await
    }

    /// # Errors
    /// Propagates store failures.
    pub async fn find_active_by_book(&self, book_id: Uuid) -> AppResult<Vec<Loan>> {
        debug!(%book_id, "fetching active loans for book");
        self.store.find_active_by_book(book_id).await
    }

    /// # Errors
    /// Propagates store failures.
    pub async fn count_active_by_user(&self, user_id: Uuid) -> AppResult<i64> {
        debug!(%user_id, "counting active loans for user");
        self.store.count_active_by_user(user_id).await
    }

    /// Close an active loan, stamping its return date. Closing an already
    /// returned or unknown loan is a no-op returning false, so a double
    /// close never mutates state.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn close(&self, loan_id: Uuid, return_date: DateTime<Utc>) -> AppResult<bool> {
        let Some(mut loan) = self.store.find_by_id(loan_id).await? else {
            warn!(%loan_id, "close requested for unknown loan");
            return Ok(false);
        };

        if !loan.is_active() {
            warn!(%loan_id, "close requested for a loan that is not active");
            return Ok(false);
        }

        loan.return_date = Some(return_date);
        loan.status = LoanStatus::Returned;
        let updated = self.store.update(&loan).await?;
        if updated {
            info!(%loan_id, "loan closed");
        }
        Ok(updated)
    }

    /// Compensation hook: undo a close whose paired catalog write failed.
    /// Only the lending workflow calls this, inside the same per-book
    /// critical section as the failed transition.
    pub(crate) async fn reopen(&self, loan_id: Uuid) -> AppResult<bool> {
        let Some(mut loan) = self.store.find_by_id(loan_id).await? else {
            return Ok(false);
        };

        loan.return_date = None;
        loan.status = LoanStatus::Active;
        let updated = self.store.update(&loan).await?;
        if updated {
            warn!(%loan_id, "loan reopened after failed catalog write");
        }
        Ok(updated)
    }
}
