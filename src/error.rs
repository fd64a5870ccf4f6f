use thiserror::Error;

/// Failure taxonomy for the ledger and settlement engine.
///
/// Every variant surfaces to the caller with no partial ledger effect; a
/// transaction-scoped operation either commits fully or not at all.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Balance debit requested more than the account holds.
    #[error("insufficient balance")]
    InsufficientFunds,
    /// Asset debit requested more than the holding contains.
    #[error("insufficient holding of {0}")]
    InsufficientHolding(String),
    #[error("{0} not found")]
    NotFound(String),
    /// Status change requested on a record already in a terminal state.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    /// Operation on an expired or otherwise ineligible record.
    #[error("{0}")]
    InvalidState(String),
    /// Gateway or other external call failed; local state is unchanged.
    #[error("external service error: {0}")]
    ExternalServiceError(String),
    /// Lease contention exceeded its bound. Safe to retry the whole operation.
    #[error("concurrent operation in progress, retry")]
    ConcurrencyConflict,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),
    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
