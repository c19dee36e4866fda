//! Lightweight handles for database interaction.
//!
//! A session owns at most one open transaction. Writes made through it are
//! stamped with that transaction, and scans started from it read the
//! transaction's snapshot. Without an open transaction every write commits
//! on its own and scans read the latest committed epoch.

use std::sync::Arc;

use quarry_common::memory::MemoryPool;
use quarry_common::mvcc::Snapshot;
use quarry_common::types::{EpochId, TableOid, TxId, Value};
use quarry_common::utils::error::{Error, Result};
use quarry_core::execution::{
    CatalogAccessor, ExecutionContext, ScanReport, TableVectorIterator, ThreadStateContainer,
    WorkerPool, parallel_scan,
};
use quarry_core::storage::{SqlTable, TupleSlot};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::transaction::{TransactionManager, TxState};

/// Your handle to the database: write rows, scan tables and manage
/// transactions.
///
/// Get one from [`Database::session()`](crate::Database::session).
pub struct Session {
    catalog: Arc<Catalog>,
    tx_manager: Arc<TransactionManager>,
    memory_pool: Arc<MemoryPool>,
    worker_pool: Arc<WorkerPool>,
    config: Config,
    /// Current transaction ID (if any).
    current_tx: Option<TxId>,
    /// Tables written by the current transaction.
    touched: Vec<TableOid>,
}

impl Session {
    pub(crate) fn new(
        catalog: Arc<Catalog>,
        tx_manager: Arc<TransactionManager>,
        memory_pool: Arc<MemoryPool>,
        worker_pool: Arc<WorkerPool>,
        config: Config,
    ) -> Self {
        Self {
            catalog,
            tx_manager,
            memory_pool,
            worker_pool,
            config,
            current_tx: None,
            touched: Vec::new(),
        }
    }

    /// Begins a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransactionAlreadyActive`] if one is already open.
    pub fn begin_tx(&mut self) -> Result<()> {
        if self.current_tx.is_some() {
            return Err(Error::TransactionAlreadyActive);
        }

        self.current_tx = Some(self.tx_manager.begin());
        Ok(())
    }

    /// Commits the current transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveTransaction`] if no transaction is open.
    pub fn commit(&mut self) -> Result<()> {
        let tx_id = self.current_tx.take().ok_or(Error::NoActiveTransaction)?;
        let tables: Vec<Arc<SqlTable>> = self
            .touched
            .drain(..)
            .filter_map(|oid| self.catalog.table(oid))
            .collect();

        self.tx_manager
            .commit_with(tx_id, |epoch| {
                for table in &tables {
                    let published = table.commit_versions(tx_id, epoch);
                    tracing::debug!(
                        "Published {} versions of {} in table {} at {}",
                        published,
                        tx_id,
                        table.oid(),
                        epoch
                    );
                }
            })
            .map(|_| ())
    }

    /// Aborts the current transaction and discards its writes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveTransaction`] if no transaction is open.
    pub fn rollback(&mut self) -> Result<()> {
        let tx_id = self.current_tx.take().ok_or(Error::NoActiveTransaction)?;

        for oid in self.touched.drain(..) {
            if let Some(table) = self.catalog.table(oid) {
                let discarded = table.discard_uncommitted_versions(tx_id);
                tracing::debug!("Discarded {} versions of {} in table {}", discarded, tx_id, oid);
            }
        }

        self.tx_manager.abort(tx_id)
    }

    /// Returns whether a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.current_tx.is_some()
    }

    /// Returns the open transaction, if any.
    #[must_use]
    pub fn current_tx(&self) -> Option<TxId> {
        self.current_tx
    }

    /// Resolves a table name.
    #[must_use]
    pub fn table_oid(&self, name: &str) -> Option<TableOid> {
        self.catalog.table_oid(name)
    }

    /// Inserts a row given in column declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableNotFound`] for an unknown table, or the
    /// validation error of [`SqlTable::insert`].
    pub fn insert(&mut self, table_oid: TableOid, row: &[Value]) -> Result<TupleSlot> {
        self.write(table_oid, |table, tx| table.insert(row, tx, EpochId::PENDING))
    }

    /// Deletes a row. Returns `false` if it was already deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableNotFound`] or [`Error::InvalidSlot`].
    pub fn delete(&mut self, table_oid: TableOid, slot: TupleSlot) -> Result<bool> {
        self.write(table_oid, |table, tx| table.delete(slot, tx, EpochId::PENDING))
    }

    /// Returns the visibility snapshot scans from this session read at.
    ///
    /// Inside a transaction this is the transaction's own snapshot; outside
    /// it is the latest committed epoch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransactionNotActive`] if the open transaction was
    /// finished behind the session's back.
    pub fn snapshot(&self) -> Result<Snapshot> {
        match self.current_tx {
            Some(tx_id) => self
                .tx_manager
                .snapshot(tx_id)
                .ok_or(Error::TransactionNotActive(tx_id)),
            None => Ok(Snapshot::new(TxId::INVALID, self.tx_manager.current_epoch())),
        }
    }

    /// Builds an execution context for scans from this session.
    ///
    /// # Errors
    ///
    /// See [`snapshot()`](Self::snapshot).
    pub fn execution_context(&self) -> Result<ExecutionContext> {
        let catalog: Arc<dyn CatalogAccessor> = self.catalog.clone();
        Ok(ExecutionContext::new(
            catalog,
            self.snapshot()?,
            Arc::clone(&self.memory_pool),
            Arc::clone(&self.worker_pool),
        )
        .with_vector_size(self.config.vector_size)
        .with_min_grain_size(self.config.min_grain_size)
        .with_adaptive_grain(self.config.adaptive_grain))
    }

    /// Creates a thread-state container on the database's worker pool.
    #[must_use]
    pub fn thread_states<T>(&self) -> ThreadStateContainer<T>
    where
        T: Send + Default + 'static,
    {
        ThreadStateContainer::new(Arc::clone(&self.worker_pool))
    }

    /// Scans a table in parallel with this session's snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableNotFound`] if the table does not resolve.
    pub fn parallel_scan<Q, T, F>(
        &self,
        table_oid: TableOid,
        query_state: &Q,
        thread_states: &ThreadStateContainer<T>,
        scanner: F,
    ) -> Result<ScanReport>
    where
        Q: Sync,
        T: Send,
        F: Fn(&Q, &mut T, &mut TableVectorIterator<'_>) + Sync,
    {
        let ctx = self.execution_context()?;
        parallel_scan(table_oid, query_state, thread_states, scanner, &ctx)
    }

    fn resolve(&self, table_oid: TableOid) -> Result<Arc<SqlTable>> {
        self.catalog
            .table(table_oid)
            .ok_or(Error::TableNotFound(table_oid))
    }

    /// Runs a write in the open transaction, or in its own one.
    ///
    /// Writes are stamped [`EpochId::PENDING`]; commit restamps them.
    fn write<R>(
        &mut self,
        table_oid: TableOid,
        op: impl FnOnce(&SqlTable, TxId) -> Result<R>,
    ) -> Result<R> {
        let table = self.resolve(table_oid)?;

        if let Some(tx_id) = self.current_tx {
            if self.tx_manager.state(tx_id) != Some(TxState::Active) {
                return Err(Error::TransactionNotActive(tx_id));
            }
            let result = op(&*table, tx_id)?;
            if !self.touched.contains(&table_oid) {
                self.touched.push(table_oid);
            }
            return Ok(result);
        }

        let tx_id = self.tx_manager.begin();
        match op(&*table, tx_id) {
            Ok(result) => {
                self.tx_manager.commit_with(tx_id, |epoch| {
                    table.commit_versions(tx_id, epoch);
                })?;
                Ok(result)
            }
            Err(e) => {
                self.tx_manager.abort(tx_id)?;
                Err(e)
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.current_tx.is_some()
            && let Err(e) = self.rollback()
        {
            tracing::warn!("Failed to roll back open transaction: {}", e);
        }
    }
}
