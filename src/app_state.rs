use crate::{
    catalog::BookCatalog, directory::UserDirectory, ledger::LoanLedger, utils::KeyedRateLimiter,
    workflow::LendingWorkflow, Config,
};
use std::sync::Arc;

/// Shared service graph for the HTTP layer. Stores are injected into the
/// services and the services into this state by whoever wires the process
/// up; nothing here is a global.
#[derive(Clone)]
pub struct AppState {
    pub catalog: BookCatalog,
    pub directory: UserDirectory,
    pub ledger: LoanLedger,
    pub workflow: Arc<LendingWorkflow>,
    pub config: Config,
    pub rate_limiter: Arc<KeyedRateLimiter>,
}
