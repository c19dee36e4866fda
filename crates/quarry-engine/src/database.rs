//! The main database struct and operations.
//!
//! Start here with [`Database`] - it owns the catalog, the transaction
//! manager, the scan buffer pool and the worker pool.

use std::sync::Arc;

use quarry_common::memory::MemoryPool;
use quarry_common::types::{EpochId, TableOid, TxId, Value};
use quarry_common::utils::error::{Error, Result};
use quarry_core::execution::{
    CatalogAccessor, ExecutionContext, ScanReport, TableVectorIterator, ThreadStateContainer,
    WorkerPool,
};
use quarry_core::storage::{Schema, SqlTable, TupleSlot};

use crate::admin::{DatabaseStats, MemoryInfo, TableInfo};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::session::Session;
use crate::transaction::TransactionManager;

/// Your handle to a Quarry database.
///
/// # Examples
///
/// ```
/// use quarry_common::types::{ColumnOid, SqlType, Value};
/// use quarry_core::storage::{Column, Schema};
/// use quarry_engine::{Config, Database};
///
/// let db = Database::new(Config::in_memory().with_threads(2))?;
/// let schema = Schema::new(vec![Column::new(ColumnOid::new(1), "a", SqlType::Integer)])?;
/// let oid = db.create_table("t", schema)?;
/// db.insert(oid, &[Value::Integer(7)])?;
///
/// let states = db.thread_states::<usize>();
/// db.parallel_scan(oid, &(), &states, |_, seen, iter| {
///     while iter.advance() {
///         *seen += iter.projected_columns_iterator().map_or(0, |pci| pci.num_tuples());
///     }
/// })?;
/// assert_eq!(states.fold(0, |acc, n| acc + *n), 1);
/// # Ok::<(), quarry_common::utils::error::Error>(())
/// ```
pub struct Database {
    /// Database configuration.
    config: Config,
    /// Table registry.
    catalog: Arc<Catalog>,
    /// Transaction manager.
    tx_manager: Arc<TransactionManager>,
    /// Pool scan batch buffers are drawn from.
    memory_pool: Arc<MemoryPool>,
    /// Workers for parallel scans.
    worker_pool: Arc<WorkerPool>,
}

impl Database {
    /// Creates a database with its own worker pool of `config.threads`
    /// threads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid, or
    /// [`Error::WorkerPool`] if the workers cannot be spawned.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let worker_pool = Arc::new(WorkerPool::new(config.threads)?);
        Self::with_worker_pool(config, worker_pool)
    }

    /// Creates a database that runs its scans on an existing pool, such as
    /// [`WorkerPool::global()`].
    ///
    /// `config.threads` is ignored in favour of the pool's size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_worker_pool(config: Config, worker_pool: Arc<WorkerPool>) -> Result<Self> {
        config.validate()?;

        let memory_pool = match config.memory_limit {
            Some(limit) => MemoryPool::with_limit(limit),
            None => MemoryPool::new(),
        };

        tracing::info!(
            threads = worker_pool.num_threads(),
            vector_size = config.vector_size,
            min_grain_size = config.min_grain_size,
            block_size = config.block_size,
            "Database created"
        );

        Ok(Self {
            catalog: Arc::new(Catalog::new(config.block_size)),
            tx_manager: Arc::new(TransactionManager::new()),
            memory_pool: Arc::new(memory_pool),
            worker_pool,
            config,
        })
    }

    /// Opens a new session.
    #[must_use]
    pub fn session(&self) -> Session {
        Session::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.tx_manager),
            Arc::clone(&self.memory_pool),
            Arc::clone(&self.worker_pool),
            self.config.clone(),
        )
    }

    /// Creates a table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableExists`] if the name is taken.
    pub fn create_table(&self, name: &str, schema: Schema) -> Result<TableOid> {
        self.catalog.create_table(name, schema)
    }

    /// Drops a table. Returns `false` if it did not exist.
    pub fn drop_table(&self, name: &str) -> bool {
        self.catalog.drop_table(name).is_some()
    }

    /// Resolves a table name.
    #[must_use]
    pub fn table_oid(&self, name: &str) -> Option<TableOid> {
        self.catalog.table_oid(name)
    }

    /// Returns a table by oid.
    #[must_use]
    pub fn table(&self, oid: TableOid) -> Option<Arc<SqlTable>> {
        self.catalog.table(oid)
    }

    /// Inserts a row in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableNotFound`] or a row validation error.
    pub fn insert(&self, table_oid: TableOid, row: &[Value]) -> Result<TupleSlot> {
        self.session().insert(table_oid, row)
    }

    /// Loads rows visible to every transaction, past and future.
    ///
    /// Rows are stamped with the system transaction at the initial epoch and
    /// bypass the transaction manager. Returns the number of rows loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableNotFound`] or the first row validation error;
    /// rows before the failing one stay loaded.
    pub fn bulk_load<I>(&self, table_oid: TableOid, rows: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: AsRef<[Value]>,
    {
        let table = self
            .catalog
            .table(table_oid)
            .ok_or(Error::TableNotFound(table_oid))?;

        let mut loaded = 0;
        for row in rows {
            table.insert(row.as_ref(), TxId::SYSTEM, EpochId::INITIAL)?;
            loaded += 1;
        }

        tracing::debug!("Bulk loaded {} rows into {}", loaded, table.name());
        Ok(loaded)
    }

    /// Builds an execution context reading the latest committed epoch.
    ///
    /// # Errors
    ///
    /// See [`Session::execution_context`].
    pub fn execution_context(&self) -> Result<ExecutionContext> {
        self.session().execution_context()
    }

    /// Creates a thread-state container on the database's worker pool.
    #[must_use]
    pub fn thread_states<T>(&self) -> ThreadStateContainer<T>
    where
        T: Send + Default + 'static,
    {
        ThreadStateContainer::new(Arc::clone(&self.worker_pool))
    }

    /// Scans a table in parallel at the latest committed epoch.
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
        self.session()
            .parallel_scan(table_oid, query_state, thread_states, scanner)
    }

    /// Describes one table.
    #[must_use]
    pub fn table_info(&self, name: &str) -> Option<TableInfo> {
        self.catalog
            .table_by_name(name)
            .map(|table| TableInfo::from(table.as_ref()))
    }

    /// Returns a snapshot of database statistics.
    #[must_use]
    pub fn stats(&self) -> DatabaseStats {
        let tables = self
            .catalog
            .list_tables()
            .iter()
            .filter_map(|name| self.table_info(name))
            .collect();

        DatabaseStats {
            tables,
            active_transactions: self.tx_manager.active_count(),
            current_epoch: self.tx_manager.current_epoch().as_u64(),
            worker_threads: self.worker_pool.num_threads(),
            memory: MemoryInfo::from(self.memory_pool.stats()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Returns the transaction manager.
    #[must_use]
    pub fn transaction_manager(&self) -> &Arc<TransactionManager> {
        &self.tx_manager
    }

    /// Returns the scan buffer pool.
    #[must_use]
    pub fn memory_pool(&self) -> &Arc<MemoryPool> {
        &self.memory_pool
    }

    /// Returns the worker pool.
    #[must_use]
    pub fn worker_pool(&self) -> &Arc<WorkerPool> {
        &self.worker_pool
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("catalog", &self.catalog)
            .field("threads", &self.worker_pool.num_threads())
            .finish_non_exhaustive()
    }
}
