//! Transaction manager.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use quarry_common::mvcc::Snapshot;
use quarry_common::types::{EpochId, TxId};
use quarry_common::utils::error::{Error, Result};
use rustc_hash::FxHashMap;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Transaction is active.
    Active,
    /// Transaction is committed.
    Committed,
    /// Transaction is aborted.
    Aborted,
}

/// Information about a transaction.
#[derive(Debug, Clone, Copy)]
pub struct TxInfo {
    /// Transaction state.
    pub state: TxState,
    /// Start epoch (snapshot epoch for reads).
    pub start_epoch: EpochId,
}

/// Hands out transactions and advances the epoch on commit.
///
/// A transaction reads at the epoch that was current when it began. Rows
/// it writes carry [`EpochId::PENDING`] until it commits, when
/// [`commit_with`](Self::commit_with) restamps them with the commit epoch.
pub struct TransactionManager {
    /// Next transaction ID.
    next_tx_id: AtomicU64,
    /// Current epoch.
    current_epoch: AtomicU64,
    /// Known transactions.
    transactions: RwLock<FxHashMap<TxId, TxInfo>>,
}

impl TransactionManager {
    /// Creates a new transaction manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            // TxId::INVALID = 0, TxId::SYSTEM = 1, user transactions start at 2
            next_tx_id: AtomicU64::new(2),
            current_epoch: AtomicU64::new(0),
            transactions: RwLock::new(FxHashMap::default()),
        }
    }

    /// Begins a new transaction.
    pub fn begin(&self) -> TxId {
        let tx_id = TxId::new(self.next_tx_id.fetch_add(1, Ordering::Relaxed));
        let epoch = EpochId::new(self.current_epoch.load(Ordering::Acquire));

        self.transactions.write().insert(
            tx_id,
            TxInfo {
                state: TxState::Active,
                start_epoch: epoch,
            },
        );
        tx_id
    }

    /// Commits a transaction and returns its commit epoch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransactionNotActive`] if the transaction is unknown
    /// or already finished.
    pub fn commit(&self, tx_id: TxId) -> Result<EpochId> {
        self.commit_with(tx_id, |_| {})
    }

    /// Commits a transaction, handing its commit epoch to `publish` before
    /// any reader can start at that epoch.
    ///
    /// `publish` restamps the transaction's pending writes. Commits are
    /// serialized, so a snapshot at the commit epoch sees every write of the
    /// transaction or none of them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransactionNotActive`] if the transaction is unknown
    /// or already finished. `publish` is not called in that case.
    pub fn commit_with<F>(&self, tx_id: TxId, publish: F) -> Result<EpochId>
    where
        F: FnOnce(EpochId),
    {
        let mut txns = self.transactions.write();
        let info = txns
            .get_mut(&tx_id)
            .filter(|info| info.state == TxState::Active)
            .ok_or(Error::TransactionNotActive(tx_id))?;

        // The write lock orders commits, so load and store cannot interleave
        let commit_epoch = EpochId::new(self.current_epoch.load(Ordering::Acquire)).next();
        publish(commit_epoch);
        self.current_epoch.store(commit_epoch.as_u64(), Ordering::SeqCst);
        info.state = TxState::Committed;
        Ok(commit_epoch)
    }

    /// Aborts a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransactionNotActive`] if the transaction is unknown
    /// or already finished.
    pub fn abort(&self, tx_id: TxId) -> Result<()> {
        let mut txns = self.transactions.write();
        let info = txns
            .get_mut(&tx_id)
            .filter(|info| info.state == TxState::Active)
            .ok_or(Error::TransactionNotActive(tx_id))?;

        info.state = TxState::Aborted;
        Ok(())
    }

    /// Returns the state of a transaction.
    pub fn state(&self, tx_id: TxId) -> Option<TxState> {
        self.transactions.read().get(&tx_id).map(|info| info.state)
    }

    /// Returns the start epoch of a transaction.
    pub fn start_epoch(&self, tx_id: TxId) -> Option<EpochId> {
        self.transactions
            .read()
            .get(&tx_id)
            .map(|info| info.start_epoch)
    }

    /// Returns the visibility snapshot of an active transaction.
    pub fn snapshot(&self, tx_id: TxId) -> Option<Snapshot> {
        self.transactions
            .read()
            .get(&tx_id)
            .filter(|info| info.state == TxState::Active)
            .map(|info| Snapshot::new(tx_id, info.start_epoch))
    }

    /// Returns the current epoch.
    #[must_use]
    pub fn current_epoch(&self) -> EpochId {
        EpochId::new(self.current_epoch.load(Ordering::Acquire))
    }

    /// Returns the number of active transactions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.transactions
            .read()
            .values()
            .filter(|info| info.state == TxState::Active)
            .count()
    }

    /// Forgets finished transactions.
    ///
    /// Returns the number of transactions cleaned up.
    pub fn gc(&self) -> usize {
        let mut txns = self.transactions.write();
        let initial_count = txns.len();
        txns.retain(|_, info| info.state == TxState::Active);
        initial_count - txns.len()
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
