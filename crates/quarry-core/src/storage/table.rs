//! Block-organized table storage.
//!
//! A [`SqlTable`] is an append-only sequence of fixed-capacity [`Block`]s.
//! Rows are addressed by [`TupleSlot`] and scanned in block order through
//! [`SlotCursor`] ranges, which is what lets parallel scans split a table by
//! block index.

use parking_lot::RwLock;

use quarry_common::mvcc::{Snapshot, VersionInfo};
use quarry_common::types::{ColumnOid, EpochId, TableOid, TxId, Value};
use quarry_common::utils::error::{Error, Result};

use super::block::Block;
use super::schema::{BlockLayout, Schema};
use super::slot::{SlotCursor, TupleSlot};
use crate::execution::projected_columns::ProjectedColumns;

/// Default number of slots per block.
pub const DEFAULT_BLOCK_SIZE: u32 = 1024;

/// A table stored as a list of blocks.
///
/// Writers take the block list's write lock for the duration of one insert
/// or delete. Scans take the read lock once per batch, so a long scan never
/// starves writers for more than one batch.
#[derive(Debug)]
pub struct SqlTable {
    oid: TableOid,
    name: String,
    schema: Schema,
    layout: BlockLayout,
    block_size: u32,
    blocks: RwLock<Vec<Block>>,
}

impl SqlTable {
    /// Creates an empty table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] if `block_size` is zero.
    pub fn new(
        oid: TableOid,
        name: impl Into<String>,
        schema: Schema,
        block_size: u32,
    ) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::InvalidLayout("block size must be positive".to_string()));
        }

        let layout = BlockLayout::new(&schema);
        Ok(Self {
            oid,
            name: name.into(),
            schema,
            layout,
            block_size,
            blocks: RwLock::new(Vec::new()),
        })
    }

    /// Returns the table oid.
    #[must_use]
    pub fn oid(&self) -> TableOid {
        self.oid
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the schema in declaration order.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the physical column layout.
    #[must_use]
    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// Returns the slot capacity of each block.
    #[must_use]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Returns the number of allocated blocks.
    #[must_use]
    pub fn block_count(&self) -> u32 {
        self.blocks.read().len() as u32
    }

    /// Returns the number of occupied slots, including deleted rows.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.blocks.read().iter().map(|b| b.len() as usize).sum()
    }

    /// Returns every column oid in the table's natural (storage) order.
    #[must_use]
    pub fn all_column_oids(&self) -> Vec<ColumnOid> {
        self.layout.column_oids()
    }

    /// Appends a row.
    ///
    /// `row` holds one value per column in declaration order. The row becomes
    /// visible to readers at `epoch`, and immediately to `tx` itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowArity`], [`Error::TypeMismatch`] or
    /// [`Error::NullViolation`] if the row does not fit the schema.
    pub fn insert(&self, row: &[Value], tx: TxId, epoch: EpochId) -> Result<TupleSlot> {
        let stored = self.to_storage_order(row)?;

        let mut blocks = self.blocks.write();
        if blocks.last().is_none_or(Block::is_full) {
            blocks.push(Block::new(&self.layout, self.block_size));
        }

        let block_idx = blocks.len() - 1;
        let offset = blocks[block_idx].push_row(&stored, VersionInfo::new(epoch, tx));
        Ok(TupleSlot::new(block_idx as u32, offset))
    }

    /// Marks a row deleted as of `epoch`.
    ///
    /// Returns `false` if the row was already deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] if `slot` does not address a row.
    pub fn delete(&self, slot: TupleSlot, tx: TxId, epoch: EpochId) -> Result<bool> {
        let mut blocks = self.blocks.write();
        let info = blocks
            .get_mut(slot.block() as usize)
            .and_then(|b| b.version_mut(slot.offset()))
            .ok_or(Error::InvalidSlot {
                block: slot.block(),
                offset: slot.offset(),
            })?;

        if info.is_deleted() {
            return Ok(false);
        }
        info.mark_deleted(epoch, tx);
        Ok(true)
    }

    /// Publishes the writes of a committing transaction at `epoch`.
    ///
    /// Rows `tx` inserted or deleted with [`EpochId::PENDING`] are restamped
    /// with `epoch`. Returns the number of versions touched.
    pub fn commit_versions(&self, tx: TxId, epoch: EpochId) -> usize {
        let mut blocks = self.blocks.write();
        blocks
            .iter_mut()
            .flat_map(|block| block.versions_mut())
            .map(|info| info.commit(tx, epoch))
            .filter(|&changed| changed)
            .count()
    }

    /// Undoes every write of an aborted transaction.
    ///
    /// Rows `tx` inserted are hidden from all readers, including rows it
    /// also deleted. Rows it only deleted become live again. Returns the
    /// number of versions touched.
    pub fn discard_uncommitted_versions(&self, tx: TxId) -> usize {
        let mut blocks = self.blocks.write();
        blocks
            .iter_mut()
            .flat_map(|block| block.versions_mut())
            .map(|info| info.rollback(tx))
            .filter(|&changed| changed)
            .count()
    }

    /// Reads a whole row in declaration order, if it is visible.
    #[must_use]
    pub fn fetch(&self, slot: TupleSlot, snapshot: &Snapshot) -> Option<Vec<Value>> {
        let blocks = self.blocks.read();
        let block = blocks.get(slot.block() as usize)?;
        let info = block.version(slot.offset())?;
        if !snapshot.sees(info) {
            return None;
        }

        let row = self
            .schema
            .columns()
            .iter()
            .map(|column| {
                // Every schema column has a storage position
                let pos = self.layout.position(column.oid()).unwrap_or_default();
                if block.is_null(pos, slot.offset()) {
                    Value::Null
                } else {
                    Value::read_le(column.sql_type(), block.value_bytes(pos, slot.offset()))
                }
            })
            .collect();
        Some(row)
    }

    /// Counts the rows visible to `snapshot`.
    #[must_use]
    pub fn visible_row_count(&self, snapshot: &Snapshot) -> usize {
        let blocks = self.blocks.read();
        blocks
            .iter()
            .map(|block| {
                (0..block.len())
                    .filter(|&offset| block.version(offset).is_some_and(|v| snapshot.sees(v)))
                    .count()
            })
            .sum()
    }

    /// Cursor at the first slot of `block`, clamped to the end of the table.
    #[must_use]
    pub fn begin_at(&self, block: u32) -> SlotCursor {
        SlotCursor::at_block(block.min(self.block_count()))
    }

    /// Cursor just past block `block - 1`, clamped to the end of the table.
    ///
    /// `begin_at(b)..end_at(e)` covers exactly the blocks in `[b, e)` that
    /// exist when the cursors are taken.
    #[must_use]
    pub fn end_at(&self, block: u32) -> SlotCursor {
        SlotCursor::at_block(block.min(self.block_count()))
    }

    /// Fills `out` with the next visible rows between `cursor` and `end`.
    ///
    /// Clears `out` first, then copies rows until the batch is full or the
    /// cursor reaches `end`. Rows `snapshot` cannot see are skipped. Returns
    /// `true` if at least one row was produced; `false` means the range is
    /// exhausted.
    pub fn range_scan(
        &self,
        snapshot: &Snapshot,
        cursor: &mut SlotCursor,
        end: &SlotCursor,
        out: &mut ProjectedColumns,
    ) -> bool {
        out.reset();

        let blocks = self.blocks.read();
        while *cursor != *end && !out.is_full() {
            let Some(block) = blocks.get(cursor.block() as usize) else {
                *cursor = *end;
                break;
            };

            if cursor.offset() >= block.len() {
                cursor.next_block();
                continue;
            }

            let offset = cursor.offset();
            if block.version(offset).is_some_and(|v| snapshot.sees(v)) {
                out.append_row(block, offset, cursor.slot());
            }
            cursor.step();
        }

        out.num_tuples() > 0
    }

    /// Validates a row and reorders it from declaration to storage order.
    fn to_storage_order(&self, row: &[Value]) -> Result<Vec<Value>> {
        let columns = self.schema.columns();
        if row.len() != columns.len() {
            return Err(Error::RowArity {
                expected: columns.len(),
                found: row.len(),
            });
        }

        let mut stored = vec![Value::Null; columns.len()];
        for (column, value) in columns.iter().zip(row) {
            match value.sql_type() {
                None if !column.is_nullable() => {
                    return Err(Error::NullViolation(column.oid()));
                }
                Some(ty) if ty != column.sql_type() => {
                    return Err(Error::TypeMismatch {
                        expected: column.sql_type(),
                        found: value.type_name(),
                    });
                }
                _ => {}
            }

            let pos = self
                .layout
                .position(column.oid())
                .ok_or(Error::ColumnNotFound {
                    table: self.oid,
                    column: column.oid(),
                })?;
            stored[pos] = *value;
        }

        Ok(stored)
    }
}
