//! Fixed-capacity columnar batch buffers.
//!
//! A [`ProjectedColumns`] holds up to `capacity` rows of a resolved column
//! set in one contiguous [`PoolBuffer`]. The layout is computed once by a
//! [`ProjectedColumnsInitializer`]; for each projected column, in projection
//! order:
//!
//! ```text
//! | null bitmap (capacity bits, padded to 8 bytes) | values (capacity * attr_size, padded to 8 bytes) |
//! ```
//!
//! The buffer is overwritten in place by every scan step and is never resized.

use quarry_common::collections::quarry_set;
use quarry_common::memory::PoolBuffer;
use quarry_common::types::{ColumnOid, ColumnValue, SqlType, TableOid, Value};
use quarry_common::utils::error::{Error, Result};

use crate::storage::block::Block;
use crate::storage::schema::BlockLayout;
use crate::storage::slot::TupleSlot;

/// Default number of rows per batch.
pub const DEFAULT_VECTOR_SIZE: usize = 2048;

/// Largest supported number of rows per batch.
pub const MAX_VECTOR_SIZE: usize = 1 << 20;

/// Alignment of the batch buffer and of every region inside it.
pub const BUFFER_ALIGN: usize = std::mem::align_of::<u64>();

#[inline]
const fn align_up(n: usize) -> Option<usize> {
    n.checked_next_multiple_of(BUFFER_ALIGN)
}

/// Per-column layout information shared by the initializer and the buffer.
#[derive(Debug, Clone)]
struct ColumnLayout {
    oid: ColumnOid,
    sql_type: SqlType,
    /// Position of the column in block storage.
    storage_col: usize,
    /// Byte offset of the null bitmap.
    null_offset: usize,
    /// Byte offset of the value array.
    value_offset: usize,
}

/// Computes the buffer layout for one column set and table.
///
/// Build it once per scan, size a buffer from
/// [`projected_columns_size`](Self::projected_columns_size), then hand the
/// buffer to [`initialize`](Self::initialize).
#[derive(Debug, Clone)]
pub struct ProjectedColumnsInitializer {
    columns: Vec<ColumnLayout>,
    capacity: usize,
    size: usize,
}

impl ProjectedColumnsInitializer {
    /// Resolves `column_oids` against `layout` and computes the buffer layout
    /// for `capacity` rows.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidLayout`] for an empty column list, zero capacity, or
    ///   a capacity whose buffer size overflows `usize`
    /// - [`Error::DuplicateColumn`] if a column is requested twice
    /// - [`Error::ColumnNotFound`] if a column is not in the table
    pub fn new(
        layout: &BlockLayout,
        table: TableOid,
        column_oids: &[ColumnOid],
        capacity: usize,
    ) -> Result<Self> {
        if column_oids.is_empty() {
            return Err(Error::InvalidLayout("no columns to project".to_string()));
        }
        if capacity == 0 {
            return Err(Error::InvalidLayout("vector size must be positive".to_string()));
        }

        let overflow =
            || Error::InvalidLayout(format!("{capacity} rows overflow the batch buffer size"));
        let bitmap_bytes = align_up(capacity.div_ceil(8)).ok_or_else(overflow)?;
        let mut seen = quarry_set();
        let mut columns = Vec::with_capacity(column_oids.len());
        let mut offset: usize = 0;

        for &oid in column_oids {
            if !seen.insert(oid) {
                return Err(Error::DuplicateColumn(oid));
            }
            let storage_col = layout
                .position(oid)
                .ok_or(Error::ColumnNotFound { table, column: oid })?;
            let sql_type = layout.column_at(storage_col).sql_type();

            let value_bytes = capacity
                .checked_mul(sql_type.attr_size())
                .and_then(align_up)
                .ok_or_else(overflow)?;
            let null_offset = offset;
            let value_offset = null_offset.checked_add(bitmap_bytes).ok_or_else(overflow)?;
            offset = value_offset.checked_add(value_bytes).ok_or_else(overflow)?;

            columns.push(ColumnLayout {
                oid,
                sql_type,
                storage_col,
                null_offset,
                value_offset,
            });
        }

        Ok(Self {
            columns,
            capacity,
            size: offset,
        })
    }

    /// Returns the number of bytes the batch buffer needs.
    #[must_use]
    pub fn projected_columns_size(&self) -> usize {
        self.size
    }

    /// Returns the row capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the projected column oids in projection order.
    #[must_use]
    pub fn column_oids(&self) -> Vec<ColumnOid> {
        self.columns.iter().map(|c| c.oid).collect()
    }

    /// Binds a buffer to this layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] if the buffer is too small or not
    /// 8-byte aligned.
    pub fn initialize(&self, buffer: PoolBuffer) -> Result<ProjectedColumns> {
        if buffer.len() < self.size {
            return Err(Error::InvalidLayout(format!(
                "buffer of {} bytes, layout needs {}",
                buffer.len(),
                self.size
            )));
        }
        if buffer.align() < BUFFER_ALIGN {
            return Err(Error::InvalidLayout(format!(
                "buffer aligned to {}, layout needs {BUFFER_ALIGN}",
                buffer.align()
            )));
        }

        Ok(ProjectedColumns {
            buffer,
            columns: self.columns.clone(),
            capacity: self.capacity,
            num_tuples: 0,
            slots: Vec::with_capacity(self.capacity),
        })
    }
}

/// One batch of rows in column-major layout.
///
/// Owns its [`PoolBuffer`]; dropping the batch returns the memory to the
/// pool. Columns are addressed by projection index (position in the
/// requested column list), never by oid.
#[derive(Debug)]
pub struct ProjectedColumns {
    buffer: PoolBuffer,
    columns: Vec<ColumnLayout>,
    capacity: usize,
    num_tuples: usize,
    /// Address of each filled row.
    slots: Vec<TupleSlot>,
}

impl ProjectedColumns {
    /// Returns the number of projected columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns the projected column oids in projection order.
    #[must_use]
    pub fn column_oids(&self) -> Vec<ColumnOid> {
        self.columns.iter().map(|c| c.oid).collect()
    }

    /// Returns the type of a projected column.
    #[must_use]
    pub fn column_type(&self, col: usize) -> Option<SqlType> {
        self.columns.get(col).map(|c| c.sql_type)
    }

    /// Returns the row capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of filled rows.
    #[must_use]
    pub fn num_tuples(&self) -> usize {
        self.num_tuples
    }

    /// Returns true if no rows are filled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_tuples == 0
    }

    /// Returns true if the batch holds `capacity` rows.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.num_tuples >= self.capacity
    }

    /// Returns the size of the backing buffer in bytes.
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the storage addresses of the filled rows.
    #[must_use]
    pub fn slots(&self) -> &[TupleSlot] {
        &self.slots
    }

    /// Empties the batch. The buffer is kept and overwritten by the next fill.
    pub fn reset(&mut self) {
        self.num_tuples = 0;
        self.slots.clear();
    }

    /// Copies the projected columns of one stored row into the next free row.
    pub(crate) fn append_row(&mut self, block: &Block, offset: u32, slot: TupleSlot) {
        debug_assert!(!self.is_full(), "append_row on a full batch");

        let row = self.num_tuples;
        let bytes = self.buffer.as_mut_slice();
        for column in &self.columns {
            let size = column.sql_type.attr_size();
            let bit = 1u8 << (row % 8);
            let null_byte = &mut bytes[column.null_offset + row / 8];

            if block.is_null(column.storage_col, offset) {
                *null_byte |= bit;
            } else {
                *null_byte &= !bit;
                let start = column.value_offset + row * size;
                bytes[start..start + size]
                    .copy_from_slice(block.value_bytes(column.storage_col, offset));
            }
        }

        self.slots.push(slot);
        self.num_tuples += 1;
    }

    fn check(&self, col: usize, row: usize) -> Result<&ColumnLayout> {
        let column = self.columns.get(col).ok_or(Error::ColumnIndexOutOfRange {
            index: col,
            count: self.columns.len(),
        })?;
        if row >= self.num_tuples {
            return Err(Error::RowIndexOutOfRange {
                index: row,
                count: self.num_tuples,
            });
        }
        Ok(column)
    }

    #[inline]
    fn null_bit(&self, column: &ColumnLayout, row: usize) -> bool {
        self.buffer.as_slice()[column.null_offset + row / 8] & (1 << (row % 8)) != 0
    }

    #[inline]
    fn raw(&self, column: &ColumnLayout, row: usize) -> &[u8] {
        let size = column.sql_type.attr_size();
        let start = column.value_offset + row * size;
        &self.buffer.as_slice()[start..start + size]
    }

    /// Returns whether a value is NULL.
    ///
    /// # Errors
    ///
    /// Fails if `col` or `row` is out of range.
    pub fn is_null(&self, col: usize, row: usize) -> Result<bool> {
        let column = self.check(col, row)?;
        Ok(self.null_bit(column, row))
    }

    /// Reads a typed value; `None` means NULL.
    ///
    /// # Errors
    ///
    /// Fails if `col` or `row` is out of range, or with
    /// [`Error::TypeMismatch`] if `T` is not the column's type.
    pub fn get<T: ColumnValue>(&self, col: usize, row: usize) -> Result<Option<T>> {
        let column = self.check(col, row)?;
        if T::SQL_TYPE != column.sql_type {
            return Err(Error::TypeMismatch {
                expected: column.sql_type,
                found: T::SQL_TYPE.name(),
            });
        }
        if self.null_bit(column, row) {
            return Ok(None);
        }
        Ok(Some(T::read_le(self.raw(column, row))))
    }

    /// Reads a value without knowing its type.
    ///
    /// # Errors
    ///
    /// Fails if `col` or `row` is out of range.
    pub fn value(&self, col: usize, row: usize) -> Result<Value> {
        let column = self.check(col, row)?;
        if self.null_bit(column, row) {
            return Ok(Value::Null);
        }
        Ok(Value::read_le(column.sql_type, self.raw(column, row)))
    }
}
