use thiserror::Error;

use crate::stock::StockKey;

/// Errors that can occur when mutating or querying the inventory ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The mutation would take the quantity below zero. Business rule
    /// violation; never retried — the caller decides the compensating
    /// action.
    #[error("insufficient stock for {key}: requested {requested}, available {available}")]
    InsufficientStock {
        key: StockKey,
        requested: i64,
        available: i64,
    },

    /// The stock row's version did not match the expected version. The
    /// engine retries these internally.
    #[error("version conflict on {key}: expected {expected:?}, found {actual:?}")]
    VersionConflict {
        key: StockKey,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    /// The stock row stayed contended through the whole retry budget.
    #[error("stock row contended after {attempts} attempts, try again later")]
    TemporarilyUnavailable { attempts: u32 },

    /// A database error occurred. The quantity/ledger write rolls back as
    /// a unit; the caller may retry with the same reference.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
