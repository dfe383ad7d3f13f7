use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a product.
///
/// Wraps the numeric catalog key to prevent mixing it up with variant or
/// order identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    /// Creates a product ID from a numeric key.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying numeric key.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the key as `i64` for database columns.
    pub fn as_i64(&self) -> i64 {
        self.0 as i64
    }

    /// Creates a product ID from a database column value.
    pub fn from_i64(id: i64) -> Self {
        Self(id as u64)
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Unique identifier for a product variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(u64);

impl VariantId {
    /// Creates a variant ID from a numeric key.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying numeric key.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the key as `i64` for database columns.
    pub fn as_i64(&self) -> i64 {
        self.0 as i64
    }

    /// Creates a variant ID from a database column value.
    pub fn from_i64(id: i64) -> Self {
        Self(id as u64)
    }
}

impl std::fmt::Display for VariantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for VariantId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Unique identifier for an order.
///
/// Orders live in a separate service; this id is the only correlation
/// between an order and the payments, shipments, and stock movements it
/// triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random order ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an order ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for OrderId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<OrderId> for Uuid {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

/// Correlation token carried by every ledger entry and compensating action.
///
/// Supplied by the calling order/payment flow; retried operations carry the
/// same reference so compensations stay idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceId(String);

impl ReferenceId {
    /// Creates a reference from any string-like token.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Derives the canonical reference for an order.
    pub fn for_order(order_id: OrderId) -> Self {
        Self(format!("order-{order_id}"))
    }

    /// Returns the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ReferenceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ReferenceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ReferenceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_roundtrips_through_i64() {
        let id = ProductId::new(42);
        assert_eq!(ProductId::from_i64(id.as_i64()), id);
    }

    #[test]
    fn order_id_new_creates_unique_ids() {
        let id1 = OrderId::new();
        let id2 = OrderId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn reference_for_order_is_stable() {
        let order_id = OrderId::new();
        assert_eq!(
            ReferenceId::for_order(order_id),
            ReferenceId::for_order(order_id)
        );
    }

    #[test]
    fn reference_id_serialization_is_transparent() {
        let reference = ReferenceId::new("order-1");
        let json = serde_json::to_string(&reference).unwrap();
        assert_eq!(json, "\"order-1\"");
        let deserialized: ReferenceId = serde_json::from_str(&json).unwrap();
        assert_eq!(reference, deserialized);
    }
}
