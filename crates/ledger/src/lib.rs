//! Inventory ledger: quantity store, append-only transaction ledger, and
//! the engine that keeps them consistent.
//!
//! Stock is never written directly. Every mutation flows through
//! [`LedgerEngine`], which commits the new quantity and a ledger entry as
//! one atomic unit, rejects negative balances, and retries contended keys
//! under a bounded policy. The ledger is the source of truth: a key's
//! quantity always equals the sum of its entry deltas.

pub mod engine;
pub mod entry;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod stock;
pub mod store;

pub use engine::{LedgerEngine, RetryPolicy};
pub use entry::{EntryId, EntryKind, LedgerEntry};
pub use error::{LedgerError, Result};
pub use memory::InMemoryStockStore;
pub use postgres::PostgresStockStore;
pub use stock::{StockKey, StockLevel};
pub use store::{StockStore, StockStream};
