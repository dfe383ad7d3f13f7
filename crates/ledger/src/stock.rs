//! Quantity-store rows keyed by product and variant.

use chrono::{DateTime, Utc};
use common::{ProductId, VariantId};
use serde::{Deserialize, Serialize};

/// Key addressing a stock row: a product plus an optional variant.
///
/// `variant = None` addresses product-level stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub product: ProductId,
    pub variant: Option<VariantId>,
}

impl StockKey {
    /// Key for product-level stock.
    pub fn product(product: impl Into<ProductId>) -> Self {
        Self {
            product: product.into(),
            variant: None,
        }
    }

    /// Key for a specific variant of a product.
    pub fn variant(product: impl Into<ProductId>, variant: impl Into<VariantId>) -> Self {
        Self {
            product: product.into(),
            variant: Some(variant.into()),
        }
    }
}

impl std::fmt::Display for StockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.variant {
            Some(variant) => write!(f, "{}/{}", self.product, variant),
            None => write!(f, "{}", self.product),
        }
    }
}

/// One quantity-store row.
///
/// Mutated exclusively through the ledger engine; `version` is the
/// optimistic-concurrency token and increments on every committed write.
/// The quantity always equals the sum of the ledger entry deltas for this
/// key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    pub key: StockKey,
    pub quantity: i64,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}
