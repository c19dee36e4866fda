//! Parallel table scans.
//!
//! [`parallel_scan`] splits a table into block partitions, runs one
//! [`ScanTask`] per partition on the context's worker pool and waits for all
//! of them. Each task scans its partition with a private
//! [`TableVectorIterator`] and hands it to the caller's scan function together
//! with the shared query state and the worker's private state.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use quarry_common::types::TableOid;
use quarry_common::utils::error::{Error, Result};

use super::partition::BlockRange;
use super::thread_state::ThreadStateContainer;
use crate::execution::context::ExecutionContext;
use crate::execution::table_vector_iterator::TableVectorIterator;

/// What happened to one partition.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionOutcome {
    /// The scan function ran over the partition.
    Scanned,
    /// The scan was cancelled before the partition started.
    Skipped,
    /// The partition's iterator failed to initialize.
    Failed(Error),
}

/// Summary of one parallel scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Table that was scanned.
    pub table: TableOid,
    /// Blocks in the table when the scan started.
    pub block_count: u32,
    /// Number of partitions scheduled.
    pub partitions: usize,
    /// Partitions whose iterator failed to initialize.
    pub failed_partitions: usize,
    /// Partitions skipped because the scan was cancelled.
    pub skipped_partitions: usize,
    /// Wall-clock time of the whole pass.
    pub elapsed: Duration,
    /// The error of every failed partition.
    pub errors: Vec<(BlockRange, Error)>,
}

impl ScanReport {
    /// Returns true if every partition was scanned.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_partitions == 0 && self.skipped_partitions == 0
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned table {} ({} blocks, {} partitions, {} failed, {} skipped) in {:.3} ms",
            self.table,
            self.block_count,
            self.partitions,
            self.failed_partitions,
            self.skipped_partitions,
            self.elapsed_ms()
        )
    }
}

/// One unit of parallel work: scans a single partition.
pub struct ScanTask<'a, Q, T, F> {
    table_oid: TableOid,
    query_state: &'a Q,
    thread_states: &'a ThreadStateContainer<T>,
    scanner: &'a F,
    exec_ctx: &'a ExecutionContext,
}

impl<'a, Q, T, F> ScanTask<'a, Q, T, F>
where
    Q: Sync,
    T: Send,
    F: Fn(&Q, &mut T, &mut TableVectorIterator<'_>) + Sync,
{
    /// Binds the shared parts of a parallel scan.
    pub fn new(
        table_oid: TableOid,
        query_state: &'a Q,
        thread_states: &'a ThreadStateContainer<T>,
        scanner: &'a F,
        exec_ctx: &'a ExecutionContext,
    ) -> Self {
        Self {
            table_oid,
            query_state,
            thread_states,
            scanner,
            exec_ctx,
        }
    }

    /// Scans `range` with a private iterator over every column.
    pub fn run(&self, range: BlockRange) -> PartitionOutcome {
        if self.exec_ctx.cancellation().is_cancelled() {
            return PartitionOutcome::Skipped;
        }

        let mut iter = TableVectorIterator::with_block_range(
            self.exec_ctx,
            self.table_oid,
            &[],
            range.start,
            range.end,
        );
        if let Err(e) = iter.init() {
            tracing::warn!(
                "Failed to initialize scan of table {} blocks {:?}: {}",
                self.table_oid,
                range,
                e
            );
            return PartitionOutcome::Failed(e);
        }

        tracing::debug!("Scanning table {} blocks {:?}", self.table_oid, range);
        let mut state = self.thread_states.access_current_thread_state();
        (self.scanner)(self.query_state, &mut *state, &mut iter);
        PartitionOutcome::Scanned
    }
}

/// Collects partition outcomes from concurrent tasks.
#[derive(Default)]
struct OutcomeCollector {
    skipped: AtomicUsize,
    failures: Mutex<Vec<(BlockRange, Error)>>,
}

impl OutcomeCollector {
    fn record(&self, range: BlockRange, outcome: PartitionOutcome) {
        match outcome {
            PartitionOutcome::Scanned => {}
            PartitionOutcome::Skipped => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            PartitionOutcome::Failed(e) => self.failures.lock().push((range, e)),
        }
    }
}

/// Scans a table in parallel.
///
/// The table's blocks are split by the context's partitioner and every
/// partition is scanned on the context's worker pool by `scanner`, which
/// receives the shared `query_state`, the calling worker's state from
/// `thread_states`, and an initialized iterator over the partition. The call
/// returns once every partition is done; per-worker results can then be
/// folded out of `thread_states`.
///
/// Partitions that fail to initialize, or that were not started because the
/// scan was cancelled, are reported in the returned [`ScanReport`] instead
/// of failing the scan.
///
/// `thread_states` should be built on the same worker pool as `exec_ctx`;
/// otherwise every task shares the container's external slot.
///
/// # Errors
///
/// Returns [`Error::TableNotFound`] if the table does not resolve; no tasks
/// are scheduled in that case.
pub fn parallel_scan<Q, T, F>(
    table_oid: TableOid,
    query_state: &Q,
    thread_states: &ThreadStateContainer<T>,
    scanner: F,
    exec_ctx: &ExecutionContext,
) -> Result<ScanReport>
where
    Q: Sync,
    T: Send,
    F: Fn(&Q, &mut T, &mut TableVectorIterator<'_>) + Sync,
{
    let start = Instant::now();

    let table = exec_ctx
        .catalog()
        .table(table_oid)
        .ok_or(Error::TableNotFound(table_oid))?;
    let block_count = table.block_count();
    let partitions = exec_ctx.partitioner().partition(block_count);

    let task = ScanTask::new(table_oid, query_state, thread_states, &scanner, exec_ctx);
    let outcomes = OutcomeCollector::default();
    exec_ctx
        .worker_pool()
        .parallel_for(&partitions, |range| outcomes.record(range, task.run(range)));

    let errors = outcomes.failures.into_inner();
    let report = ScanReport {
        table: table_oid,
        block_count,
        partitions: partitions.len(),
        failed_partitions: errors.len(),
        skipped_partitions: outcomes.skipped.into_inner(),
        elapsed: start.elapsed(),
        errors,
    };

    tracing::info!(
        table = %report.table,
        blocks = report.block_count,
        partitions = report.partitions,
        failed = report.failed_partitions,
        skipped = report.skipped_partitions,
        elapsed_ms = report.elapsed_ms(),
        "Parallel scan finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::context::CatalogAccessor;
    use crate::storage::table::SqlTable;
    use crate::testing::{TestCatalog, context, int_table};
    use std::sync::Arc;
    use std::sync::atomic::AtomicU64;

    fn count_rows(_: &(), count: &mut usize, iter: &mut TableVectorIterator<'_>) {
        while iter.advance() {
            *count += iter.projected_columns().map_or(0, |p| p.num_tuples());
        }
    }

    #[test]
    fn test_missing_table_schedules_nothing() {
        let ctx = context(TestCatalog::default());
        let states: ThreadStateContainer<usize> = ThreadStateContainer::new(Arc::clone(ctx.worker_pool()));

        let result = parallel_scan(TableOid::new(5), &(), &states, count_rows, &ctx);
        assert!(matches!(result, Err(Error::TableNotFound(_))));
        assert_eq!(states.active_states(), 0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let catalog = TestCatalog::default();
        catalog.add(int_table(1, 1000, 16));
        let ctx = context(catalog).with_vector_size(100);
        let states: ThreadStateContainer<usize> = ThreadStateContainer::new(Arc::clone(ctx.worker_pool()));

        let report = parallel_scan(TableOid::new(1), &(), &states, count_rows, &ctx).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.block_count, 63);
        assert_eq!(report.partitions, 21);
        assert_eq!(states.fold(0, |acc, n| acc + *n), 1000);
    }

    #[test]
    fn test_shared_query_state() {
        let catalog = TestCatalog::default();
        catalog.add(int_table(1, 300, 8));
        let ctx = context(catalog);
        let states: ThreadStateContainer<()> = ThreadStateContainer::new(Arc::clone(ctx.worker_pool()));
        let sum = AtomicU64::new(0);

        let report = parallel_scan(
            TableOid::new(1),
            &sum,
            &states,
            |sum, _, iter| {
                while iter.advance() {
                    let mut pci = iter.projected_columns_iterator().unwrap();
                    while pci.has_next() {
                        let v = pci.get::<i32>(0).unwrap().unwrap();
                        sum.fetch_add(v as u64, Ordering::Relaxed);
                        pci.advance();
                    }
                }
            },
            &ctx,
        )
        .unwrap();

        assert!(report.is_complete());
        assert_eq!(sum.load(Ordering::Relaxed), (0..300u64).sum::<u64>());
    }

    #[test]
    fn test_empty_table_has_no_partitions() {
        let catalog = TestCatalog::default();
        catalog.add(int_table(1, 0, 8));
        let ctx = context(catalog);
        let states: ThreadStateContainer<usize> = ThreadStateContainer::new(Arc::clone(ctx.worker_pool()));

        let report = parallel_scan(TableOid::new(1), &(), &states, count_rows, &ctx).unwrap();
        assert_eq!(report.partitions, 0);
        assert!(report.is_complete());
        assert_eq!(states.fold(0, |acc, n| acc + *n), 0);
    }

    #[test]
    fn test_cancelled_scan_skips_partitions() {
        let catalog = TestCatalog::default();
        catalog.add(int_table(1, 100, 4));
        let ctx = context(catalog);
        ctx.cancellation().cancel();
        let states: ThreadStateContainer<usize> = ThreadStateContainer::new(Arc::clone(ctx.worker_pool()));

        let report = parallel_scan(TableOid::new(1), &(), &states, count_rows, &ctx).unwrap();
        assert_eq!(report.skipped_partitions, report.partitions);
        assert!(!report.is_complete());
        assert_eq!(states.fold(0, |acc, n| acc + *n), 0);
    }

    /// Catalog that stops resolving its table after the first lookup.
    struct FlakyCatalog {
        table: Arc<SqlTable>,
        lookups: AtomicUsize,
    }

    impl CatalogAccessor for FlakyCatalog {
        fn table(&self, oid: TableOid) -> Option<Arc<SqlTable>> {
            let n = self.lookups.fetch_add(1, Ordering::SeqCst);
            (n == 0 && oid == self.table.oid()).then(|| Arc::clone(&self.table))
        }

        fn table_oid(&self, _name: &str) -> Option<TableOid> {
            Some(self.table.oid())
        }
    }

    #[test]
    fn test_partition_failures_are_reported() {
        let catalog = FlakyCatalog {
            table: Arc::new(int_table(1, 40, 4)),
            lookups: AtomicUsize::new(0),
        };
        let ctx = crate::testing::context_with(Arc::new(catalog));
        let states: ThreadStateContainer<usize> = ThreadStateContainer::new(Arc::clone(ctx.worker_pool()));

        let report = parallel_scan(TableOid::new(1), &(), &states, count_rows, &ctx).unwrap();

        assert_eq!(report.partitions, 3);
        assert_eq!(report.failed_partitions, 3);
        assert!(
            report
                .errors
                .iter()
                .all(|(_, e)| *e == Error::TableNotFound(TableOid::new(1)))
        );
        assert!(!report.is_complete());
        assert!(report.to_string().contains("3 failed"));
    }
}
