//! Everything a scan needs from its surroundings.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use quarry_common::memory::MemoryPool;
use quarry_common::mvcc::Snapshot;
use quarry_common::types::TableOid;

use super::parallel::partition::{DEFAULT_MIN_GRAIN_SIZE, ScanPartitioner};
use super::parallel::worker_pool::WorkerPool;
use super::projected_columns::DEFAULT_VECTOR_SIZE;
use crate::storage::table::SqlTable;

/// Resolves table identifiers to table handles.
pub trait CatalogAccessor: Send + Sync {
    /// Returns the table with this oid, or `None` if there is none.
    fn table(&self, oid: TableOid) -> Option<Arc<SqlTable>>;

    /// Returns the oid of the table with this name.
    fn table_oid(&self, name: &str) -> Option<TableOid>;
}

/// A shared flag that asks running scans to stop early.
///
/// Clones share the flag. Scans check it between partitions; scan callbacks
/// can check it between batches through
/// [`TableVectorIterator::is_cancelled`](super::TableVectorIterator::is_cancelled).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns whether cancellation was requested.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Per-query execution state: catalog, visibility snapshot, memory pool,
/// worker pool and scan tuning knobs.
#[derive(Clone)]
pub struct ExecutionContext {
    catalog: Arc<dyn CatalogAccessor>,
    snapshot: Snapshot,
    memory_pool: Arc<MemoryPool>,
    worker_pool: Arc<WorkerPool>,
    vector_size: usize,
    min_grain_size: usize,
    adaptive_grain: bool,
    cancellation: CancellationToken,
}

impl ExecutionContext {
    /// Creates a context with default vector and grain sizes.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogAccessor>,
        snapshot: Snapshot,
        memory_pool: Arc<MemoryPool>,
        worker_pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            catalog,
            snapshot,
            memory_pool,
            worker_pool,
            vector_size: DEFAULT_VECTOR_SIZE,
            min_grain_size: DEFAULT_MIN_GRAIN_SIZE,
            adaptive_grain: false,
            cancellation: CancellationToken::new(),
        }
    }

    /// Sets the batch capacity.
    #[must_use]
    pub fn with_vector_size(mut self, vector_size: usize) -> Self {
        self.vector_size = vector_size;
        self
    }

    /// Sets the minimum number of blocks per parallel partition.
    #[must_use]
    pub fn with_min_grain_size(mut self, min_grain_size: usize) -> Self {
        self.min_grain_size = min_grain_size;
        self
    }

    /// Derives the grain from the table size and worker count.
    #[must_use]
    pub fn with_adaptive_grain(mut self, adaptive: bool) -> Self {
        self.adaptive_grain = adaptive;
        self
    }

    /// Uses an existing cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogAccessor {
        self.catalog.as_ref()
    }

    /// Returns the visibility snapshot scans read at.
    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Returns the pool batch buffers are allocated from.
    #[must_use]
    pub fn memory_pool(&self) -> &Arc<MemoryPool> {
        &self.memory_pool
    }

    /// Returns the worker pool parallel scans run on.
    #[must_use]
    pub fn worker_pool(&self) -> &Arc<WorkerPool> {
        &self.worker_pool
    }

    /// Returns the batch capacity.
    #[must_use]
    pub fn vector_size(&self) -> usize {
        self.vector_size
    }

    /// Returns the minimum grain size.
    #[must_use]
    pub fn min_grain_size(&self) -> usize {
        self.min_grain_size
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Builds the partitioner for this context's grain settings.
    #[must_use]
    pub fn partitioner(&self) -> ScanPartitioner {
        let partitioner = ScanPartitioner::new(self.min_grain_size);
        if self.adaptive_grain {
            partitioner.with_workers(self.worker_pool.num_threads())
        } else {
            partitioner
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("snapshot", &self.snapshot)
            .field("vector_size", &self.vector_size)
            .field("min_grain_size", &self.min_grain_size)
            .field("adaptive_grain", &self.adaptive_grain)
            .field("threads", &self.worker_pool.num_threads())
            .finish_non_exhaustive()
    }
}
