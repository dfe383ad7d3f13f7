use std::pin::Pin;

use async_trait::async_trait;
use common::{ProductId, ReferenceId, VariantId};
use futures_core::Stream;

use crate::{LedgerEntry, Result, StockKey, StockLevel};

/// A lazy stream of stock rows.
pub type StockStream = Pin<Box<dyn Stream<Item = Result<StockLevel>> + Send>>;

/// Durable storage contract for the quantity store and transaction ledger.
///
/// The single write path is [`StockStore::commit`], which must persist the
/// new quantity and the ledger entry as one atomic unit — either both land
/// or neither does. Per-key writes serialize through the version guard;
/// writes on different keys are independent. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Reads the stock row for a key.
    ///
    /// Returns `None` if the key has never been stocked.
    async fn get(&self, key: &StockKey) -> Result<Option<StockLevel>>;

    /// Atomically writes the new quantity and appends the ledger entry.
    ///
    /// `expected_version` is the optimistic-concurrency guard:
    /// - `None` asserts the row does not exist yet and creates it at
    ///   version 1;
    /// - `Some(v)` asserts the row is currently at version `v` and bumps
    ///   it to `v + 1`.
    ///
    /// On mismatch the call fails with `VersionConflict` and nothing is
    /// written. The row key is taken from `entry.key`.
    async fn commit(
        &self,
        expected_version: Option<u64>,
        new_quantity: i64,
        entry: LedgerEntry,
    ) -> Result<StockLevel>;

    /// Ledger entries for a product, chronological.
    ///
    /// `variant = None` spans every variant of the product, including
    /// product-level entries.
    async fn entries_for_product(
        &self,
        product: ProductId,
        variant: Option<VariantId>,
    ) -> Result<Vec<LedgerEntry>>;

    /// Ledger entries carrying the given reference, chronological.
    async fn entries_for_reference(&self, reference: &ReferenceId) -> Result<Vec<LedgerEntry>>;

    /// The most recent entries across all keys, newest first.
    async fn recent_entries(&self, limit: usize) -> Result<Vec<LedgerEntry>>;

    /// Stock rows with `quantity <= threshold`, ascending by quantity.
    async fn low_stock(&self, threshold: i64) -> Result<StockStream>;

    /// Every stock row.
    async fn levels(&self) -> Result<Vec<StockLevel>>;
}
