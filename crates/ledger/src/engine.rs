//! The inventory ledger engine: the single write path for stock.

use std::time::Duration;

use common::{ProductId, ReferenceId, VariantId};

use crate::entry::{EntryKind, LedgerEntry};
use crate::error::{LedgerError, Result};
use crate::stock::{StockKey, StockLevel};
use crate::store::{StockStore, StockStream};

/// Bounded retry for version conflicts on a contended stock row.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total commit attempts before surfacing `TemporarilyUnavailable`.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub base_delay: Duration,
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(10),
        }
    }
}

/// Enforces the ledger discipline over a [`StockStore`].
///
/// Every quantity mutation commits together with exactly one ledger entry,
/// balances never go negative, and contended keys are retried under a
/// bounded policy. Callers never write stock directly; this engine is the
/// only mutation path.
pub struct LedgerEngine<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S: StockStore> LedgerEngine<S> {
    /// Creates an engine with the default retry policy.
    pub fn new(store: S) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    /// Creates an engine with a custom retry policy.
    pub fn with_retry(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Gets a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reserves `qty` units for pending fulfillment.
    ///
    /// Fails with `InsufficientStock` when the available quantity would go
    /// negative; a key that was never stocked counts as zero.
    #[tracing::instrument(skip(self), fields(%key, %reference))]
    pub async fn reserve(
        &self,
        key: StockKey,
        qty: u32,
        reference: ReferenceId,
    ) -> Result<LedgerEntry> {
        self.mutate(key, -i64::from(qty), reference, EntryKind::Reserve, None)
            .await
    }

    /// Returns previously reserved units to stock.
    ///
    /// Idempotent per reference: once the reference's reservations on this
    /// key are balanced by a committed release, further releases are no-ops
    /// returning the prior release entry, so retried compensations are
    /// safe. The check runs inside the commit retry loop, so racing
    /// duplicates collapse to a single applied entry.
    #[tracing::instrument(skip(self), fields(%key, %reference))]
    pub async fn release(
        &self,
        key: StockKey,
        qty: u32,
        reference: ReferenceId,
    ) -> Result<LedgerEntry> {
        self.mutate(key, i64::from(qty), reference, EntryKind::Release, None)
            .await
    }

    /// Records an inbound restock. Creates the stock row on first use; no
    /// upper bound.
    #[tracing::instrument(skip(self), fields(%key, %reference))]
    pub async fn receive(
        &self,
        key: StockKey,
        qty: u32,
        reference: ReferenceId,
    ) -> Result<LedgerEntry> {
        self.mutate(key, i64::from(qty), reference, EntryKind::Receive, None)
            .await
    }

    /// Applies a manual correction.
    ///
    /// `delta` may be negative but the resulting balance must stay
    /// non-negative. The reason lands on the ledger entry's note.
    #[tracing::instrument(skip(self, reason), fields(%key, %reference))]
    pub async fn adjust(
        &self,
        key: StockKey,
        delta: i64,
        reference: ReferenceId,
        reason: impl Into<String>,
    ) -> Result<LedgerEntry> {
        self.mutate(key, delta, reference, EntryKind::Adjust, Some(reason.into()))
            .await
    }

    /// Reads the current stock row for a key.
    pub async fn stock(&self, key: &StockKey) -> Result<Option<StockLevel>> {
        self.store.get(key).await
    }

    /// Stock rows at or below the caller-supplied threshold, ascending by
    /// quantity.
    pub async fn low_stock(&self, threshold: i64) -> Result<StockStream> {
        self.store.low_stock(threshold).await
    }

    /// Ledger history for a product, chronological — balances are only
    /// meaningful in sequence. `variant = None` spans every variant.
    pub async fn history(
        &self,
        product: ProductId,
        variant: Option<VariantId>,
    ) -> Result<Vec<LedgerEntry>> {
        self.store.entries_for_product(product, variant).await
    }

    /// Ledger entries carrying the given reference, chronological.
    pub async fn entries_for_reference(&self, reference: &ReferenceId) -> Result<Vec<LedgerEntry>> {
        self.store.entries_for_reference(reference).await
    }

    /// The most recent entries across all keys, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<LedgerEntry>> {
        self.store.recent_entries(limit).await
    }

    /// Every stock row.
    pub async fn levels(&self) -> Result<Vec<StockLevel>> {
        self.store.levels().await
    }

    async fn mutate(
        &self,
        key: StockKey,
        delta: i64,
        reference: ReferenceId,
        kind: EntryKind,
        note: Option<String>,
    ) -> Result<LedgerEntry> {
        let mut attempt = 1u32;
        loop {
            if kind == EntryKind::Release
                && let Some(prior) = self.replayed_release(&key, &reference).await?
            {
                tracing::debug!(%key, %reference, "release already applied, returning prior entry");
                return Ok(prior);
            }

            let current = self.store.get(&key).await?;
            let (available, expected_version) = match &current {
                Some(row) => (row.quantity, Some(row.version)),
                None => (0, None),
            };

            let balance = available + delta;
            if balance < 0 {
                metrics::counter!("ledger_insufficient_stock_total").increment(1);
                return Err(LedgerError::InsufficientStock {
                    key,
                    requested: -delta,
                    available,
                });
            }

            let mut entry = LedgerEntry::new(key, reference.clone(), delta, balance, kind);
            if let Some(note) = &note {
                entry = entry.with_note(note.clone());
            }
            let recorded = entry.clone();

            match self.store.commit(expected_version, balance, entry).await {
                Ok(_) => {
                    metrics::counter!("ledger_entries_total", "kind" => kind.as_str())
                        .increment(1);
                    return Ok(recorded);
                }
                Err(LedgerError::VersionConflict { .. }) if attempt < self.retry.max_attempts => {
                    metrics::counter!("ledger_conflicts_total").increment(1);
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                    attempt += 1;
                }
                Err(LedgerError::VersionConflict { .. }) => {
                    metrics::counter!("ledger_contention_exhausted_total").increment(1);
                    return Err(LedgerError::TemporarilyUnavailable {
                        attempts: self.retry.max_attempts,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Finds a prior release that already balanced this reference's
    /// reservations on the key. Returns it when the release would be a
    /// replay; `None` when there are outstanding reserved units to return.
    async fn replayed_release(
        &self,
        key: &StockKey,
        reference: &ReferenceId,
    ) -> Result<Option<LedgerEntry>> {
        let entries = self.store.entries_for_reference(reference).await?;

        let mut outstanding = 0i64;
        let mut prior = None;
        for entry in entries.iter().filter(|e| e.key == *key) {
            match entry.kind {
                EntryKind::Reserve | EntryKind::Release => outstanding -= entry.quantity_change,
                EntryKind::Adjust | EntryKind::Receive => {}
            }
            if entry.kind == EntryKind::Release {
                prior = Some(entry.clone());
            }
        }

        if outstanding <= 0 { Ok(prior) } else { Ok(None) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStockStore;
    use futures_util::StreamExt;

    fn engine() -> LedgerEngine<InMemoryStockStore> {
        LedgerEngine::new(InMemoryStockStore::new())
    }

    #[tokio::test]
    async fn reserve_release_scenario() {
        let engine = engine();
        let key = StockKey::product(42u64);

        engine
            .receive(key, 5, ReferenceId::new("po-1"))
            .await
            .unwrap();

        let reserved = engine
            .reserve(key, 5, ReferenceId::new("order-1"))
            .await
            .unwrap();
        assert_eq!(reserved.kind, EntryKind::Reserve);
        assert_eq!(reserved.quantity_change, -5);
        assert_eq!(reserved.balance_after, 0);
        assert_eq!(engine.stock(&key).await.unwrap().unwrap().quantity, 0);

        let denied = engine.reserve(key, 1, ReferenceId::new("order-2")).await;
        assert!(matches!(
            denied,
            Err(LedgerError::InsufficientStock {
                requested: 1,
                available: 0,
                ..
            })
        ));

        let released = engine
            .release(key, 5, ReferenceId::new("order-1"))
            .await
            .unwrap();
        assert_eq!(released.kind, EntryKind::Release);
        assert_eq!(released.balance_after, 5);
        assert_eq!(engine.stock(&key).await.unwrap().unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn reserve_on_unknown_key_is_insufficient() {
        let engine = engine();
        let result = engine
            .reserve(StockKey::product(99u64), 1, ReferenceId::new("order-1"))
            .await;
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientStock { available: 0, .. })
        ));
    }

    #[tokio::test]
    async fn release_is_idempotent_per_reference() {
        let engine = engine();
        let key = StockKey::product(1u64);
        let reference = ReferenceId::new("order-1");

        engine.receive(key, 10, ReferenceId::new("po-1")).await.unwrap();
        engine.reserve(key, 4, reference.clone()).await.unwrap();

        let first = engine.release(key, 4, reference.clone()).await.unwrap();
        let second = engine.release(key, 4, reference.clone()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(engine.stock(&key).await.unwrap().unwrap().quantity, 10);

        // one release entry, not two
        let releases: Vec<_> = engine
            .entries_for_reference(&reference)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.kind == EntryKind::Release)
            .collect();
        assert_eq!(releases.len(), 1);
    }

    #[tokio::test]
    async fn release_applies_again_after_new_reservation() {
        let engine = engine();
        let key = StockKey::product(1u64);
        let reference = ReferenceId::new("order-1");

        engine.receive(key, 10, ReferenceId::new("po-1")).await.unwrap();

        // first attempt: reserve then compensate
        engine.reserve(key, 4, reference.clone()).await.unwrap();
        engine.release(key, 4, reference.clone()).await.unwrap();

        // retried attempt under the same reference holds new units
        engine.reserve(key, 4, reference.clone()).await.unwrap();
        assert_eq!(engine.stock(&key).await.unwrap().unwrap().quantity, 6);

        engine.release(key, 4, reference.clone()).await.unwrap();
        assert_eq!(engine.stock(&key).await.unwrap().unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn adjust_respects_non_negativity() {
        let engine = engine();
        let key = StockKey::variant(7u64, 2u64);

        engine.receive(key, 3, ReferenceId::new("po-1")).await.unwrap();

        let denied = engine
            .adjust(key, -4, ReferenceId::new("adj-1"), "shrinkage")
            .await;
        assert!(matches!(denied, Err(LedgerError::InsufficientStock { .. })));

        let applied = engine
            .adjust(key, -3, ReferenceId::new("adj-2"), "shrinkage")
            .await
            .unwrap();
        assert_eq!(applied.balance_after, 0);
        assert_eq!(applied.note.as_deref(), Some("shrinkage"));
    }

    #[tokio::test]
    async fn adjust_creates_row_with_positive_delta() {
        let engine = engine();
        let key = StockKey::product(8u64);

        let entry = engine
            .adjust(key, 6, ReferenceId::new("adj-1"), "found in warehouse")
            .await
            .unwrap();
        assert_eq!(entry.balance_after, 6);
        assert_eq!(engine.stock(&key).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn history_is_chronological_with_running_balance() {
        let engine = engine();
        let key = StockKey::product(1u64);

        engine.receive(key, 10, ReferenceId::new("po-1")).await.unwrap();
        engine.reserve(key, 4, ReferenceId::new("order-1")).await.unwrap();
        engine.release(key, 4, ReferenceId::new("order-1")).await.unwrap();
        engine.reserve(key, 2, ReferenceId::new("order-2")).await.unwrap();

        let history = engine.history(key.product, None).await.unwrap();
        let balances: Vec<_> = history.iter().map(|e| e.balance_after).collect();
        assert_eq!(balances, vec![10, 6, 10, 8]);

        // the invariant: quantity equals the sum of deltas
        let sum: i64 = history.iter().map(|e| e.quantity_change).sum();
        assert_eq!(engine.stock(&key).await.unwrap().unwrap().quantity, sum);
    }

    #[tokio::test]
    async fn low_stock_orders_ascending() {
        let engine = engine();

        engine
            .receive(StockKey::product(1u64), 12, ReferenceId::new("po-1"))
            .await
            .unwrap();
        engine
            .receive(StockKey::product(2u64), 2, ReferenceId::new("po-2"))
            .await
            .unwrap();
        engine
            .receive(StockKey::product(3u64), 5, ReferenceId::new("po-3"))
            .await
            .unwrap();

        let rows: Vec<_> = engine
            .low_stock(5)
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect::<Vec<_>>()
            .await;

        let quantities: Vec<_> = rows.iter().map(|r| r.quantity).collect();
        assert_eq!(quantities, vec![2, 5]);
    }

    #[tokio::test]
    async fn variant_keys_do_not_interfere() {
        let engine = engine();
        let product_level = StockKey::product(1u64);
        let variant = StockKey::variant(1u64, 5u64);

        engine
            .receive(product_level, 3, ReferenceId::new("po-1"))
            .await
            .unwrap();
        engine.receive(variant, 7, ReferenceId::new("po-2")).await.unwrap();

        engine
            .reserve(variant, 7, ReferenceId::new("order-1"))
            .await
            .unwrap();

        assert_eq!(
            engine.stock(&product_level).await.unwrap().unwrap().quantity,
            3
        );
        assert_eq!(engine.stock(&variant).await.unwrap().unwrap().quantity, 0);
    }
}
