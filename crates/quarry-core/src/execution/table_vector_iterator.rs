//! Vectorized sequential table scans.
//!
//! A [`TableVectorIterator`] walks a block range of one table and fills a
//! reusable columnar batch on every [`advance`](TableVectorIterator::advance).
//! The batch buffer is allocated once in [`init`](TableVectorIterator::init)
//! and goes back to the memory pool when the iterator is dropped.
//!
//! ```ignore
//! let mut iter = TableVectorIterator::new(&ctx, table_oid, &[]);
//! iter.init()?;
//! while iter.advance() {
//!     let mut pci = iter.projected_columns_iterator().unwrap();
//!     while pci.has_next() {
//!         let value = pci.get::<i32>(0)?;
//!         pci.advance();
//!     }
//! }
//! ```

use std::sync::Arc;

use quarry_common::types::{ColumnOid, TableOid};
use quarry_common::utils::error::{Error, Result};

use super::context::ExecutionContext;
use super::parallel::partition::BlockRange;
use super::parallel::scan::{ScanReport, parallel_scan};
use super::parallel::thread_state::ThreadStateContainer;
use super::projected_columns::{BUFFER_ALIGN, ProjectedColumns, ProjectedColumnsInitializer};
use super::projected_columns_iterator::ProjectedColumnsIterator;
use crate::storage::slot::SlotCursor;
use crate::storage::table::SqlTable;

/// State that exists once the iterator is initialized.
#[derive(Debug)]
struct ScanState {
    table: Arc<SqlTable>,
    projected: ProjectedColumns,
    start: SlotCursor,
    current: SlotCursor,
    end: SlotCursor,
    /// Row position of the cursor handed out for the current batch.
    row: usize,
    /// Whether `projected` holds rows from the last `advance()`.
    has_batch: bool,
}

/// Scans a block range of a table one batch at a time.
///
/// The iterator is driven by one thread; parallel scans give every
/// partition its own iterator.
#[derive(Debug)]
pub struct TableVectorIterator<'a> {
    exec_ctx: &'a ExecutionContext,
    table_oid: TableOid,
    requested: Vec<ColumnOid>,
    range: BlockRange,
    scan: Option<ScanState>,
}

impl<'a> TableVectorIterator<'a> {
    /// Creates an iterator over the whole table.
    ///
    /// An empty `column_oids` list projects every column in the table's
    /// natural order.
    #[must_use]
    pub fn new(exec_ctx: &'a ExecutionContext, table_oid: TableOid, column_oids: &[ColumnOid]) -> Self {
        Self::with_block_range(exec_ctx, table_oid, column_oids, 0, u32::MAX)
    }

    /// Creates an iterator over blocks `[start_block, end_block)`.
    ///
    /// Bounds past the end of the table are clamped when the iterator is
    /// initialized; `start_block >= end_block` scans nothing.
    #[must_use]
    pub fn with_block_range(
        exec_ctx: &'a ExecutionContext,
        table_oid: TableOid,
        column_oids: &[ColumnOid],
        start_block: u32,
        end_block: u32,
    ) -> Self {
        Self {
            exec_ctx,
            table_oid,
            requested: column_oids.to_vec(),
            range: BlockRange::new(start_block, end_block.max(start_block)),
            scan: None,
        }
    }

    /// Resolves the table and columns and allocates the batch buffer.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyInitialized`] on a second call
    /// - [`Error::TableNotFound`] if the catalog has no such table
    /// - [`Error::ColumnNotFound`] or [`Error::DuplicateColumn`] for a bad
    ///   column list
    /// - [`Error::OutOfMemory`] if the memory pool refuses the buffer
    pub fn init(&mut self) -> Result<()> {
        if self.scan.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let table = self
            .exec_ctx
            .catalog()
            .table(self.table_oid)
            .ok_or(Error::TableNotFound(self.table_oid))?;

        let column_oids = resolve_column_oids(&table, &self.requested);
        let initializer = ProjectedColumnsInitializer::new(
            table.layout(),
            self.table_oid,
            &column_oids,
            self.exec_ctx.vector_size(),
        )?;
        let buffer = self
            .exec_ctx
            .memory_pool()
            .allocate_aligned(initializer.projected_columns_size(), BUFFER_ALIGN)?;
        let projected = initializer.initialize(buffer)?;

        let start = table.begin_at(self.range.start);
        let end = table.end_at(self.range.end);

        self.scan = Some(ScanState {
            table,
            projected,
            start,
            current: start,
            end,
            row: 0,
            has_batch: false,
        });
        Ok(())
    }

    /// Fills the batch with the next rows of the range.
    ///
    /// Returns `false` when the iterator is not initialized or the range is
    /// exhausted. Any row cursor from the previous batch is invalidated.
    pub fn advance(&mut self) -> bool {
        let Some(scan) = self.scan.as_mut() else {
            return false;
        };

        scan.row = 0;
        if scan.current == scan.end {
            scan.has_batch = false;
            scan.projected.reset();
            return false;
        }

        scan.has_batch = scan.table.range_scan(
            self.exec_ctx.snapshot(),
            &mut scan.current,
            &scan.end,
            &mut scan.projected,
        );
        scan.has_batch
    }

    /// Moves back to the start of the range and discards the current batch.
    pub fn reset(&mut self) {
        if let Some(scan) = self.scan.as_mut() {
            scan.current = scan.start;
            scan.row = 0;
            scan.has_batch = false;
            scan.projected.reset();
        }
    }

    /// Returns a row cursor over the current batch, or `None` unless the
    /// last [`advance`](Self::advance) produced rows.
    pub fn projected_columns_iterator(&mut self) -> Option<ProjectedColumnsIterator<'_>> {
        let scan = self.scan.as_mut().filter(|s| s.has_batch)?;
        Some(ProjectedColumnsIterator::new(&scan.projected, &mut scan.row))
    }

    /// Returns the current batch, if any.
    #[must_use]
    pub fn projected_columns(&self) -> Option<&ProjectedColumns> {
        self.scan
            .as_ref()
            .filter(|s| s.has_batch)
            .map(|s| &s.projected)
    }

    /// Returns the table being scanned.
    #[must_use]
    pub fn table_oid(&self) -> TableOid {
        self.table_oid
    }

    /// Returns the requested block range.
    #[must_use]
    pub fn block_range(&self) -> BlockRange {
        self.range
    }

    /// Returns the resolved column set, once initialized.
    #[must_use]
    pub fn column_oids(&self) -> Option<Vec<ColumnOid>> {
        self.scan.as_ref().map(|s| s.projected.column_oids())
    }

    /// Returns true once [`init`](Self::init) has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.scan.is_some()
    }

    /// Returns whether the scan's cancellation token has been triggered.
    ///
    /// Scan callbacks check this between batches.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.exec_ctx.cancellation().is_cancelled()
    }

    /// Returns the execution context the iterator runs in.
    #[must_use]
    pub fn exec_ctx(&self) -> &'a ExecutionContext {
        self.exec_ctx
    }

    /// Scans a table in parallel; see
    /// [`parallel_scan`](super::parallel::scan::parallel_scan).
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableNotFound`] if the table does not resolve.
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
        parallel_scan(table_oid, query_state, thread_states, scanner, exec_ctx)
    }
}

/// Returns the columns to project: the request as given, or every column in
/// storage order when nothing was requested.
fn resolve_column_oids(table: &SqlTable, requested: &[ColumnOid]) -> Vec<ColumnOid> {
    if requested.is_empty() {
        table.all_column_oids()
    } else {
        requested.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestCatalog, context, int_table};
    use quarry_common::types::Value;

    fn scan_all(iter: &mut TableVectorIterator<'_>) -> Vec<i32> {
        let mut values = Vec::new();
        while iter.advance() {
            let mut pci = iter.projected_columns_iterator().unwrap();
            while pci.has_next() {
                values.push(pci.get::<i32>(0).unwrap().unwrap());
                pci.advance();
            }
        }
        values
    }

    #[test]
    fn test_advance_before_init() {
        let ctx = context(TestCatalog::default());
        let mut iter = TableVectorIterator::new(&ctx, TableOid::new(1), &[]);

        assert!(!iter.advance());
        assert!(iter.projected_columns_iterator().is_none());
        iter.reset();
        assert!(!iter.is_initialized());
    }

    #[test]
    fn test_missing_table() {
        let ctx = context(TestCatalog::default());
        let mut iter = TableVectorIterator::new(&ctx, TableOid::new(99), &[]);
        assert_eq!(iter.init(), Err(Error::TableNotFound(TableOid::new(99))));
        assert!(!iter.advance());
    }

    #[test]
    fn test_double_init() {
        let catalog = TestCatalog::default();
        catalog.add(int_table(1, 10, 4));
        let ctx = context(catalog);

        let mut iter = TableVectorIterator::new(&ctx, TableOid::new(1), &[]);
        iter.init().unwrap();
        assert_eq!(iter.init(), Err(Error::AlreadyInitialized));
    }

    #[test]
    fn test_scans_in_batches() {
        let catalog = TestCatalog::default();
        catalog.add(int_table(1, 25, 4));
        let ctx = context(catalog).with_vector_size(8);

        let mut iter = TableVectorIterator::new(&ctx, TableOid::new(1), &[]);
        iter.init().unwrap();

        let mut batches = Vec::new();
        while iter.advance() {
            batches.push(iter.projected_columns().unwrap().num_tuples());
        }
        assert_eq!(batches, vec![8, 8, 8, 1]);
        assert!(!iter.advance());
    }

    #[test]
    fn test_block_range_bounds() {
        let catalog = TestCatalog::default();
        catalog.add(int_table(1, 20, 4));
        let ctx = context(catalog);

        // Blocks 1 and 2 hold rows 4..12
        let mut iter = TableVectorIterator::with_block_range(&ctx, TableOid::new(1), &[], 1, 3);
        iter.init().unwrap();
        assert_eq!(scan_all(&mut iter), (4..12).collect::<Vec<_>>());

        // Inverted and out-of-range bounds scan nothing
        let mut iter = TableVectorIterator::with_block_range(&ctx, TableOid::new(1), &[], 3, 1);
        iter.init().unwrap();
        assert!(!iter.advance());

        let mut iter = TableVectorIterator::with_block_range(&ctx, TableOid::new(1), &[], 50, 60);
        iter.init().unwrap();
        assert!(!iter.advance());
    }

    #[test]
    fn test_reset_restarts_scan() {
        let catalog = TestCatalog::default();
        catalog.add(int_table(1, 10, 4));
        let ctx = context(catalog).with_vector_size(3);

        let mut iter = TableVectorIterator::new(&ctx, TableOid::new(1), &[]);
        iter.init().unwrap();
        let first = scan_all(&mut iter);

        iter.reset();
        assert!(iter.projected_columns_iterator().is_none());
        assert_eq!(scan_all(&mut iter), first);
        assert_eq!(first.len(), 10);
    }

    #[test]
    fn test_deleted_rows_skipped() {
        let catalog = TestCatalog::default();
        let table = int_table(1, 6, 4);
        let slot = crate::storage::slot::TupleSlot::new(0, 2);
        table
            .delete(slot, quarry_common::types::TxId::SYSTEM, quarry_common::types::EpochId::INITIAL)
            .unwrap();
        catalog.add(table);
        let ctx = context(catalog);

        let mut iter = TableVectorIterator::new(&ctx, TableOid::new(1), &[]);
        iter.init().unwrap();
        assert_eq!(scan_all(&mut iter), vec![0, 1, 3, 4, 5]);
    }

    #[test]
    fn test_buffer_released_on_drop() {
        let catalog = TestCatalog::default();
        catalog.add(int_table(1, 10, 4));
        let ctx = context(catalog);
        let pool = Arc::clone(ctx.memory_pool());

        {
            let mut iter = TableVectorIterator::new(&ctx, TableOid::new(1), &[]);
            iter.init().unwrap();
            while iter.advance() {}
            assert_eq!(pool.stats().outstanding(), 1);
            assert!(pool.allocated_bytes() > 0);
        }

        let stats = pool.stats();
        assert_eq!(stats.allocation_count, 1);
        assert_eq!(stats.deallocation_count, 1);
        assert_eq!(stats.allocated_bytes, 0);
    }

    #[test]
    fn test_cursor_reports_slots_and_values() {
        let catalog = TestCatalog::default();
        catalog.add(int_table(1, 5, 2));
        let ctx = context(catalog);

        let mut iter = TableVectorIterator::new(&ctx, TableOid::new(1), &[ColumnOid::new(1)]);
        iter.init().unwrap();
        assert_eq!(iter.column_oids(), Some(vec![ColumnOid::new(1)]));
        assert!(iter.advance());

        let mut pci = iter.projected_columns_iterator().unwrap();
        pci.advance();
        pci.advance();
        pci.advance();
        assert_eq!(pci.current_slot(), Some(crate::storage::slot::TupleSlot::new(1, 1)));
        assert_eq!(pci.value(0).unwrap(), Value::Integer(3));
    }
}
