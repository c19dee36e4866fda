//! Fork-join worker pool for parallel scans.
//!
//! A thin wrapper over a dedicated `rayon` thread pool. Scans submit one task
//! per partition with [`WorkerPool::parallel_for`], which returns only after
//! every task has run; rayon's work stealing balances uneven partitions.

use std::fmt;
use std::sync::{Arc, OnceLock};

use quarry_common::utils::error::{Error, Result};
use rayon::prelude::*;

use super::partition::BlockRange;

static GLOBAL_POOL: OnceLock<Arc<WorkerPool>> = OnceLock::new();

/// A fixed-size pool of worker threads.
pub struct WorkerPool {
    /// Number of worker threads.
    num_threads: usize,
    /// Thread pool for parallel execution.
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Creates a pool with `num_threads` workers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerPool`] if `num_threads` is zero or the threads
    /// cannot be spawned.
    pub fn new(num_threads: usize) -> Result<Self> {
        if num_threads == 0 {
            return Err(Error::WorkerPool("num_threads must be positive".to_string()));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("quarry-worker-{i}"))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;

        Ok(Self { num_threads, pool })
    }

    /// Returns the process-wide pool, creating it on first use with one
    /// worker per available CPU.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerPool`] if the pool has to be created and that
    /// fails.
    pub fn global() -> Result<Arc<Self>> {
        if let Some(pool) = GLOBAL_POOL.get() {
            return Ok(Arc::clone(pool));
        }

        let threads = std::thread::available_parallelism().map_or(1, usize::from);
        let pool = Arc::new(Self::new(threads)?);
        tracing::debug!("Created global worker pool with {} threads", threads);

        // Another thread may have won the race; use whichever pool got in
        let _ = GLOBAL_POOL.set(pool);
        GLOBAL_POOL
            .get()
            .cloned()
            .ok_or_else(|| Error::WorkerPool("global pool not initialized".to_string()))
    }

    /// Returns the number of workers.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Returns the index of the calling worker, or `None` when called from a
    /// thread outside this pool.
    #[must_use]
    pub fn worker_index(&self) -> Option<usize> {
        self.pool.current_thread_index()
    }

    /// Runs `f` once per range on the pool and waits for all of them.
    pub fn parallel_for<F>(&self, ranges: &[BlockRange], f: F)
    where
        F: Fn(BlockRange) + Sync + Send,
    {
        if ranges.is_empty() {
            return;
        }

        self.pool.install(|| {
            ranges.par_iter().for_each(|&range| f(range));
        });
    }

    /// Runs `op` inside the pool.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_threads", &self.num_threads)
            .finish()
    }
}
