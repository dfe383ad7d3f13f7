use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ProductId, ReferenceId, VariantId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EntryId, EntryKind, LedgerEntry, LedgerError, Result, StockKey, StockLevel,
    store::{StockStore, StockStream},
};

/// PostgreSQL-backed stock store.
///
/// Quantity and ledger writes happen inside one transaction; the
/// `version` column serializes writers on the same key while different
/// keys proceed in parallel.
#[derive(Clone)]
pub struct PostgresStockStore {
    pool: PgPool,
}

impl PostgresStockStore {
    /// Creates a new PostgreSQL stock store over an existing pool.
    ///
    /// The pool is owned by the process that built it and should be closed
    /// on shutdown; the store only borrows connections from it.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the versioned schema scripts.
    ///
    /// Deployment applies these once; this helper exists for tests and
    /// local development.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_level(row: PgRow) -> Result<StockLevel> {
        let product = ProductId::from_i64(row.try_get("product_id")?);
        let variant = row
            .try_get::<Option<i64>, _>("variant_id")?
            .map(VariantId::from_i64);
        Ok(StockLevel {
            key: StockKey { product, variant },
            quantity: row.try_get("quantity")?,
            version: row.try_get::<i64, _>("version")? as u64,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_entry(row: PgRow) -> Result<LedgerEntry> {
        let product = ProductId::from_i64(row.try_get("product_id")?);
        let variant = row
            .try_get::<Option<i64>, _>("variant_id")?
            .map(VariantId::from_i64);
        let kind_str: String = row.try_get("kind")?;
        let kind = EntryKind::parse(&kind_str).ok_or_else(|| {
            LedgerError::Database(sqlx::Error::Decode(
                format!("unknown ledger entry kind: {kind_str}").into(),
            ))
        })?;

        Ok(LedgerEntry {
            id: EntryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            reference: ReferenceId::new(row.try_get::<String, _>("reference_id")?),
            key: StockKey { product, variant },
            quantity_change: row.try_get("quantity_change")?,
            balance_after: row.try_get("balance_after")?,
            kind,
            note: row.try_get("note")?,
            recorded_at: row.try_get::<DateTime<Utc>, _>("recorded_at")?,
        })
    }

    async fn current_version(
        tx: &mut sqlx::PgConnection,
        key: &StockKey,
    ) -> Result<Option<u64>> {
        let version: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM stock_levels
             WHERE product_id = $1 AND variant_id IS NOT DISTINCT FROM $2",
        )
        .bind(key.product.as_i64())
        .bind(key.variant.map(|v| v.as_i64()))
        .fetch_optional(tx)
        .await?;

        Ok(version.map(|v| v as u64))
    }
}

#[async_trait]
impl StockStore for PostgresStockStore {
    async fn get(&self, key: &StockKey) -> Result<Option<StockLevel>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT product_id, variant_id, quantity, version, updated_at
            FROM stock_levels
            WHERE product_id = $1 AND variant_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(key.product.as_i64())
        .bind(key.variant.map(|v| v.as_i64()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_level).transpose()
    }

    async fn commit(
        &self,
        expected_version: Option<u64>,
        new_quantity: i64,
        entry: LedgerEntry,
    ) -> Result<StockLevel> {
        let key = entry.key;
        let mut tx = self.pool.begin().await?;

        let new_version = match expected_version {
            None => {
                let inserted = sqlx::query(
                    r#"
                    INSERT INTO stock_levels (product_id, variant_id, quantity, version, updated_at)
                    VALUES ($1, $2, $3, 1, $4)
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(key.product.as_i64())
                .bind(key.variant.map(|v| v.as_i64()))
                .bind(new_quantity)
                .bind(entry.recorded_at)
                .execute(&mut *tx)
                .await?;

                if inserted.rows_affected() == 0 {
                    let actual = Self::current_version(&mut *tx, &key).await?;
                    return Err(LedgerError::VersionConflict {
                        key,
                        expected: None,
                        actual,
                    });
                }
                1
            }
            Some(expected) => {
                let updated = sqlx::query(
                    r#"
                    UPDATE stock_levels
                    SET quantity = $1, version = version + 1, updated_at = $2
                    WHERE product_id = $3 AND variant_id IS NOT DISTINCT FROM $4
                      AND version = $5
                    "#,
                )
                .bind(new_quantity)
                .bind(entry.recorded_at)
                .bind(key.product.as_i64())
                .bind(key.variant.map(|v| v.as_i64()))
                .bind(expected as i64)
                .execute(&mut *tx)
                .await?;

                if updated.rows_affected() == 0 {
                    let actual = Self::current_version(&mut *tx, &key).await?;
                    return Err(LedgerError::VersionConflict {
                        key,
                        expected: Some(expected),
                        actual,
                    });
                }
                expected + 1
            }
        };

        sqlx::query(
            r#"
            INSERT INTO ledger_entries
                (id, reference_id, product_id, variant_id, quantity_change,
                 balance_after, kind, note, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.reference.as_str())
        .bind(key.product.as_i64())
        .bind(key.variant.map(|v| v.as_i64()))
        .bind(entry.quantity_change)
        .bind(entry.balance_after)
        .bind(entry.kind.as_str())
        .bind(&entry.note)
        .bind(entry.recorded_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(StockLevel {
            key,
            quantity: new_quantity,
            version: new_version,
            updated_at: entry.recorded_at,
        })
    }

    async fn entries_for_product(
        &self,
        product: ProductId,
        variant: Option<VariantId>,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = match variant {
            Some(variant) => {
                sqlx::query(
                    r#"
                    SELECT id, reference_id, product_id, variant_id, quantity_change,
                           balance_after, kind, note, recorded_at
                    FROM ledger_entries
                    WHERE product_id = $1 AND variant_id = $2
                    ORDER BY recorded_at ASC, id ASC
                    "#,
                )
                .bind(product.as_i64())
                .bind(variant.as_i64())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, reference_id, product_id, variant_id, quantity_change,
                           balance_after, kind, note, recorded_at
                    FROM ledger_entries
                    WHERE product_id = $1
                    ORDER BY recorded_at ASC, id ASC
                    "#,
                )
                .bind(product.as_i64())
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn entries_for_reference(&self, reference: &ReferenceId) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, reference_id, product_id, variant_id, quantity_change,
                   balance_after, kind, note, recorded_at
            FROM ledger_entries
            WHERE reference_id = $1
            ORDER BY recorded_at ASC, id ASC
            "#,
        )
        .bind(reference.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn recent_entries(&self, limit: usize) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, reference_id, product_id, variant_id, quantity_change,
                   balance_after, kind, note, recorded_at
            FROM ledger_entries
            ORDER BY recorded_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn low_stock(&self, threshold: i64) -> Result<StockStream> {
        use futures_util::StreamExt;

        let stream = sqlx::query(
            r#"
            SELECT product_id, variant_id, quantity, version, updated_at
            FROM stock_levels
            WHERE quantity <= $1
            ORDER BY quantity ASC, product_id ASC
            "#,
        )
        .bind(threshold)
        .fetch(&self.pool)
        .map(|result| match result {
            Ok(row) => Self::row_to_level(row),
            Err(e) => Err(LedgerError::Database(e)),
        });

        Ok(Box::pin(stream))
    }

    async fn levels(&self) -> Result<Vec<StockLevel>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, variant_id, quantity, version, updated_at
            FROM stock_levels
            ORDER BY product_id ASC, variant_id ASC NULLS FIRST
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_level).collect()
    }
}
