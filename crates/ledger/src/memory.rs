use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ProductId, ReferenceId, VariantId};
use tokio::sync::RwLock;

use crate::{
    LedgerEntry, LedgerError, Result, StockKey, StockLevel,
    store::{StockStore, StockStream},
};

#[derive(Default)]
struct Inner {
    rows: HashMap<StockKey, StockLevel>,
    entries: Vec<LedgerEntry>,
}

/// In-memory stock store for testing and single-process deployments.
///
/// Provides the same interface and version-guard semantics as the
/// PostgreSQL implementation. The critical section never awaits, so the
/// commit is atomic with respect to concurrent callers.
#[derive(Clone, Default)]
pub struct InMemoryStockStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStockStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of ledger entries.
    pub async fn entry_count(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Clears all rows and entries.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.rows.clear();
        inner.entries.clear();
    }
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn get(&self, key: &StockKey) -> Result<Option<StockLevel>> {
        Ok(self.inner.read().await.rows.get(key).cloned())
    }

    async fn commit(
        &self,
        expected_version: Option<u64>,
        new_quantity: i64,
        entry: LedgerEntry,
    ) -> Result<StockLevel> {
        let key = entry.key;
        let mut inner = self.inner.write().await;

        let actual = inner.rows.get(&key).map(|row| row.version);
        let matches = match (expected_version, actual) {
            (None, None) => true,
            (Some(expected), Some(current)) => expected == current,
            _ => false,
        };
        if !matches {
            return Err(LedgerError::VersionConflict {
                key,
                expected: expected_version,
                actual,
            });
        }

        let row = StockLevel {
            key,
            quantity: new_quantity,
            version: actual.map_or(1, |v| v + 1),
            updated_at: entry.recorded_at,
        };
        inner.rows.insert(key, row.clone());
        inner.entries.push(entry);

        Ok(row)
    }

    async fn entries_for_product(
        &self,
        product: ProductId,
        variant: Option<VariantId>,
    ) -> Result<Vec<LedgerEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| {
                e.key.product == product && variant.is_none_or(|v| e.key.variant == Some(v))
            })
            .cloned()
            .collect())
    }

    async fn entries_for_reference(&self, reference: &ReferenceId) -> Result<Vec<LedgerEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| &e.reference == reference)
            .cloned()
            .collect())
    }

    async fn recent_entries(&self, limit: usize) -> Result<Vec<LedgerEntry>> {
        let inner = self.inner.read().await;
        Ok(inner.entries.iter().rev().take(limit).cloned().collect())
    }

    async fn low_stock(&self, threshold: i64) -> Result<StockStream> {
        use futures_util::stream;

        let inner = self.inner.read().await;
        let mut rows: Vec<_> = inner
            .rows
            .values()
            .filter(|row| row.quantity <= threshold)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.quantity
                .cmp(&b.quantity)
                .then(a.key.product.cmp(&b.key.product))
        });

        Ok(Box::pin(stream::iter(rows.into_iter().map(Ok))))
    }

    async fn levels(&self) -> Result<Vec<StockLevel>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<_> = inner.rows.values().cloned().collect();
        rows.sort_by(|a, b| {
            a.key
                .product
                .cmp(&b.key.product)
                .then(a.key.variant.cmp(&b.key.variant))
        });
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;
    use futures_util::StreamExt;

    fn entry(key: StockKey, reference: &str, change: i64, balance: i64) -> LedgerEntry {
        let kind = if change < 0 {
            EntryKind::Reserve
        } else {
            EntryKind::Receive
        };
        LedgerEntry::new(key, ReferenceId::new(reference), change, balance, kind)
    }

    #[tokio::test]
    async fn commit_creates_row_at_version_one() {
        let store = InMemoryStockStore::new();
        let key = StockKey::product(1u64);

        let row = store.commit(None, 10, entry(key, "r1", 10, 10)).await.unwrap();
        assert_eq!(row.quantity, 10);
        assert_eq!(row.version, 1);
    }

    #[tokio::test]
    async fn commit_bumps_version_on_update() {
        let store = InMemoryStockStore::new();
        let key = StockKey::product(1u64);

        store.commit(None, 10, entry(key, "r1", 10, 10)).await.unwrap();
        let row = store.commit(Some(1), 7, entry(key, "r2", -3, 7)).await.unwrap();
        assert_eq!(row.quantity, 7);
        assert_eq!(row.version, 2);
    }

    #[tokio::test]
    async fn commit_rejects_stale_version() {
        let store = InMemoryStockStore::new();
        let key = StockKey::product(1u64);

        store.commit(None, 10, entry(key, "r1", 10, 10)).await.unwrap();
        store.commit(Some(1), 7, entry(key, "r2", -3, 7)).await.unwrap();

        let result = store.commit(Some(1), 5, entry(key, "r3", -2, 5)).await;
        assert!(matches!(
            result,
            Err(LedgerError::VersionConflict {
                expected: Some(1),
                actual: Some(2),
                ..
            })
        ));

        // nothing was written
        assert_eq!(store.get(&key).await.unwrap().unwrap().quantity, 7);
        assert_eq!(store.entry_count().await, 2);
    }

    #[tokio::test]
    async fn commit_rejects_create_when_row_exists() {
        let store = InMemoryStockStore::new();
        let key = StockKey::product(1u64);

        store.commit(None, 10, entry(key, "r1", 10, 10)).await.unwrap();
        let result = store.commit(None, 5, entry(key, "r2", 5, 5)).await;
        assert!(matches!(result, Err(LedgerError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn entries_for_product_spans_variants_when_unfiltered() {
        let store = InMemoryStockStore::new();
        let product_level = StockKey::product(1u64);
        let variant_a = StockKey::variant(1u64, 10u64);
        let other = StockKey::product(2u64);

        store
            .commit(None, 5, entry(product_level, "r1", 5, 5))
            .await
            .unwrap();
        store.commit(None, 3, entry(variant_a, "r2", 3, 3)).await.unwrap();
        store.commit(None, 9, entry(other, "r3", 9, 9)).await.unwrap();

        let all = store
            .entries_for_product(ProductId::new(1), None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let only_variant = store
            .entries_for_product(ProductId::new(1), Some(VariantId::new(10)))
            .await
            .unwrap();
        assert_eq!(only_variant.len(), 1);
        assert_eq!(only_variant[0].key, variant_a);
    }

    #[tokio::test]
    async fn recent_entries_newest_first() {
        let store = InMemoryStockStore::new();
        let key = StockKey::product(1u64);

        store.commit(None, 5, entry(key, "r1", 5, 5)).await.unwrap();
        store.commit(Some(1), 8, entry(key, "r2", 3, 8)).await.unwrap();
        store.commit(Some(2), 6, entry(key, "r3", -2, 6)).await.unwrap();

        let recent = store.recent_entries(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].reference, ReferenceId::new("r3"));
        assert_eq!(recent[1].reference, ReferenceId::new("r2"));
    }

    #[tokio::test]
    async fn low_stock_ascending_by_quantity() {
        let store = InMemoryStockStore::new();
        let a = StockKey::product(1u64);
        let b = StockKey::product(2u64);
        let c = StockKey::product(3u64);

        store.commit(None, 8, entry(a, "r1", 8, 8)).await.unwrap();
        store.commit(None, 2, entry(b, "r2", 2, 2)).await.unwrap();
        store.commit(None, 5, entry(c, "r3", 5, 5)).await.unwrap();

        let stream = store.low_stock(5).await.unwrap();
        let rows: Vec<_> = stream.map(|r| r.unwrap()).collect::<Vec<_>>().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, b);
        assert_eq!(rows[1].key, c);
    }
}
