//! Identifier types for tables, columns and transactions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog identifier of a table.
///
/// Assigned by the catalog when the table is created. Oid `0` is reserved
/// as the invalid table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[repr(transparent)]
pub struct TableOid(pub u32);

impl TableOid {
    /// The invalid/null table oid.
    pub const INVALID: Self = Self(0);

    /// Creates a new TableOid from a raw u32 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw u32 value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Checks if this is a valid table oid.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for TableOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "TableOid({})", self.0)
        } else {
            write!(f, "TableOid(INVALID)")
        }
    }
}

impl fmt::Display for TableOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TableOid {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<TableOid> for u32 {
    fn from(id: TableOid) -> Self {
        id.0
    }
}

/// Identifier of a column within its table.
///
/// Column oids are unique per table and start at 1, in declaration order.
/// They say nothing about where the column lives in storage.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[repr(transparent)]
pub struct ColumnOid(pub u32);

impl ColumnOid {
    /// Creates a new ColumnOid from a raw u32 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw u32 value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ColumnOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnOid({})", self.0)
    }
}

impl fmt::Display for ColumnOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ColumnOid {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Transaction identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[repr(transparent)]
pub struct TxId(pub u64);

impl TxId {
    /// The invalid/null transaction ID.
    pub const INVALID: Self = Self(0);

    /// The system transaction, used for bulk loads outside user transactions.
    pub const SYSTEM: Self = Self(1);

    /// Creates a new TxId from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Checks if this is a valid transaction ID.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INVALID => write!(f, "TxId(INVALID)"),
            Self::SYSTEM => write!(f, "TxId(SYSTEM)"),
            Self(id) => write!(f, "TxId({id})"),
        }
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Epoch identifier for MVCC visibility.
///
/// Epochs only move forward. Every commit advances the global epoch, and a
/// reader sees everything committed at or before its start epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[repr(transparent)]
pub struct EpochId(pub u64);

impl EpochId {
    /// The initial epoch (epoch 0).
    pub const INITIAL: Self = Self(0);

    /// Stamp for writes whose transaction has not committed yet.
    ///
    /// No reader epoch ever reaches it; commit replaces it with the commit
    /// epoch.
    pub const PENDING: Self = Self(u64::MAX);

    /// Creates a new EpochId from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next epoch.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns whether something created in this epoch is visible to a
    /// reader at `viewing`.
    #[inline]
    #[must_use]
    pub const fn is_visible_at(self, viewing: Self) -> bool {
        self.0 != Self::PENDING.0 && self.0 <= viewing.0
    }

    /// Returns whether this is the [`PENDING`](Self::PENDING) stamp.
    #[inline]
    #[must_use]
    pub const fn is_pending(self) -> bool {
        self.0 == Self::PENDING.0
    }
}

impl fmt::Debug for EpochId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EpochId({})", self.0)
    }
}

impl fmt::Display for EpochId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
