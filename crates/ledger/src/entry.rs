//! Append-only transaction ledger entries.

use chrono::{DateTime, Utc};
use common::ReferenceId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stock::StockKey;

/// Unique identifier for a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Creates a new random entry ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an entry ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of quantity mutation an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Stock decremented for a pending order.
    Reserve,
    /// Compensating increment returning reserved stock.
    Release,
    /// Manual correction, signed either way.
    Adjust,
    /// Inbound restock.
    Receive,
}

impl EntryKind {
    /// Returns the kind name as stored in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Reserve => "RESERVE",
            EntryKind::Release => "RELEASE",
            EntryKind::Adjust => "ADJUST",
            EntryKind::Receive => "RECEIVE",
        }
    }

    /// Parses a stored kind name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RESERVE" => Some(EntryKind::Reserve),
            "RELEASE" => Some(EntryKind::Release),
            "ADJUST" => Some(EntryKind::Adjust),
            "RECEIVE" => Some(EntryKind::Receive),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable row of the transaction ledger.
///
/// Entries are never updated or deleted. `balance_after` snapshots the
/// stock quantity as of this entry, so a chronological read of a key's
/// entries replays its balance history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub reference: ReferenceId,
    pub key: StockKey,
    pub quantity_change: i64,
    pub balance_after: i64,
    pub kind: EntryKind,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Creates an entry stamped with a fresh id and the current time.
    pub fn new(
        key: StockKey,
        reference: ReferenceId,
        quantity_change: i64,
        balance_after: i64,
        kind: EntryKind,
    ) -> Self {
        Self {
            id: EntryId::new(),
            reference,
            key,
            quantity_change,
            balance_after,
            kind,
            note: None,
            recorded_at: Utc::now(),
        }
    }

    /// Attaches an operator-supplied note (used by manual adjustments).
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
