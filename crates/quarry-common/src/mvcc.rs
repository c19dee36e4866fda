//! MVCC visibility metadata for stored rows.
//!
//! Every tuple slot carries a [`VersionInfo`]. Scans pass a reader's epoch
//! and transaction id, and rows the reader cannot see are skipped while a
//! batch is being filled.

use crate::types::{EpochId, TxId};

/// Tracks when a row was created and deleted for visibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    /// The epoch this row becomes visible in.
    pub created_epoch: EpochId,
    /// The epoch this row was deleted in (if any).
    pub deleted_epoch: Option<EpochId>,
    /// The transaction that created this row.
    pub created_by: TxId,
    /// The transaction that deleted this row (if any).
    pub deleted_by: Option<TxId>,
}

impl VersionInfo {
    /// Creates a new version info.
    #[must_use]
    pub fn new(created_epoch: EpochId, created_by: TxId) -> Self {
        Self {
            created_epoch,
            deleted_epoch: None,
            created_by,
            deleted_by: None,
        }
    }

    /// Marks this row as deleted.
    pub fn mark_deleted(&mut self, epoch: EpochId, tx: TxId) {
        self.deleted_epoch = Some(epoch);
        self.deleted_by = Some(tx);
    }

    /// Clears a deletion mark.
    pub fn unmark_deleted(&mut self) {
        self.deleted_epoch = None;
        self.deleted_by = None;
    }

    /// Replaces the pending stamps `tx` left on this row with `epoch`.
    ///
    /// Returns whether anything changed.
    pub fn commit(&mut self, tx: TxId, epoch: EpochId) -> bool {
        let mut changed = false;
        if self.created_by == tx && self.created_epoch.is_pending() {
            self.created_epoch = epoch;
            changed = true;
        }
        if self.deleted_by == Some(tx) && self.deleted_epoch.is_some_and(EpochId::is_pending) {
            self.deleted_epoch = Some(epoch);
            changed = true;
        }
        changed
    }

    /// Undoes what an aborted `tx` did to this row.
    ///
    /// A row `tx` created is hidden for good, even if `tx` also deleted it.
    /// A row it only deleted becomes live again. Returns whether anything
    /// changed.
    pub fn rollback(&mut self, tx: TxId) -> bool {
        if self.created_by == tx {
            self.mark_deleted(EpochId::INITIAL, TxId::INVALID);
            true
        } else if self.deleted_by == Some(tx) {
            self.unmark_deleted();
            true
        } else {
            false
        }
    }

    /// Returns whether the row has been deleted by anyone.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_epoch.is_some()
    }

    /// Checks if this row is visible at the given epoch.
    #[must_use]
    pub fn is_visible_at(&self, epoch: EpochId) -> bool {
        if !self.created_epoch.is_visible_at(epoch) {
            return false;
        }

        match self.deleted_epoch {
            // Not visible if deleted at or before the viewing epoch
            Some(deleted) => deleted.as_u64() > epoch.as_u64(),
            None => true,
        }
    }

    /// Checks if this row is visible to a specific transaction.
    ///
    /// A transaction always sees its own inserts (unless it deleted them
    /// again) and never sees rows it deleted itself. Everything else falls
    /// back to epoch visibility.
    #[must_use]
    pub fn is_visible_to(&self, viewing_epoch: EpochId, viewing_tx: TxId) -> bool {
        if self.deleted_by == Some(viewing_tx) {
            return false;
        }

        if self.created_by == viewing_tx {
            return true;
        }

        self.is_visible_at(viewing_epoch)
    }
}

/// A reader's view of the table: which transaction is reading, at which
/// epoch.
///
/// This is the visibility token scans pass down to storage. It is cheap to
/// copy and carries no locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// The reading transaction.
    pub tx: TxId,
    /// The epoch the reader started at.
    pub epoch: EpochId,
}

impl Snapshot {
    /// Creates a snapshot for `tx` reading at `epoch`.
    #[must_use]
    pub const fn new(tx: TxId, epoch: EpochId) -> Self {
        Self { tx, epoch }
    }

    /// Returns whether a row with this version info is visible.
    #[inline]
    #[must_use]
    pub fn sees(&self, info: &VersionInfo) -> bool {
        info.is_visible_to(self.epoch, self.tx)
    }
}
