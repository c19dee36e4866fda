//! Row cursor over a filled batch.

use quarry_common::types::{ColumnOid, ColumnValue, Value};
use quarry_common::utils::error::Result;

use super::projected_columns::ProjectedColumns;
use crate::storage::slot::TupleSlot;

/// Forward cursor over the rows of the current [`ProjectedColumns`] batch.
///
/// The cursor borrows both the batch and the row position owned by the
/// table iterator that produced it, so it cannot be held across the next
/// `advance()`. The position survives between calls that hand out a new
/// cursor for the same batch; call [`reset`](Self::reset) to traverse the
/// batch a second time.
///
/// # Examples
///
/// ```ignore
/// while iter.advance() {
///     let mut pci = iter.projected_columns_iterator().unwrap();
///     while pci.has_next() {
///         let id = pci.get::<i32>(0)?;
///         pci.advance();
///     }
/// }
/// ```
#[derive(Debug)]
pub struct ProjectedColumnsIterator<'a> {
    columns: &'a ProjectedColumns,
    position: &'a mut usize,
}

impl<'a> ProjectedColumnsIterator<'a> {
    pub(crate) fn new(columns: &'a ProjectedColumns, position: &'a mut usize) -> Self {
        Self { columns, position }
    }

    /// Returns true while the cursor points at a filled row.
    #[inline]
    #[must_use]
    pub fn has_next(&self) -> bool {
        *self.position < self.columns.num_tuples()
    }

    /// Moves to the next row.
    #[inline]
    pub fn advance(&mut self) {
        *self.position += 1;
    }

    /// Moves back to the first row of the batch.
    pub fn reset(&mut self) {
        *self.position = 0;
    }

    /// Returns the current row index within the batch.
    #[must_use]
    pub fn position(&self) -> usize {
        *self.position
    }

    /// Returns the number of rows in the batch.
    #[must_use]
    pub fn num_tuples(&self) -> usize {
        self.columns.num_tuples()
    }

    /// Returns the number of projected columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.num_columns()
    }

    /// Returns the projected column oids, indexed like [`get`](Self::get).
    #[must_use]
    pub fn column_oids(&self) -> Vec<ColumnOid> {
        self.columns.column_oids()
    }

    /// Reads column `col` of the current row; `None` means NULL.
    ///
    /// # Errors
    ///
    /// Fails if the cursor is past the last row, `col` is out of range, or
    /// `T` does not match the column type.
    pub fn get<T: ColumnValue>(&self, col: usize) -> Result<Option<T>> {
        self.columns.get(col, *self.position)
    }

    /// Reads column `col` of the current row as a [`Value`].
    ///
    /// # Errors
    ///
    /// Fails if the cursor is past the last row or `col` is out of range.
    pub fn value(&self, col: usize) -> Result<Value> {
        self.columns.value(col, *self.position)
    }

    /// Returns whether column `col` of the current row is NULL.
    ///
    /// # Errors
    ///
    /// Fails if the cursor is past the last row or `col` is out of range.
    pub fn is_null(&self, col: usize) -> Result<bool> {
        self.columns.is_null(col, *self.position)
    }

    /// Returns the storage address of the current row.
    #[must_use]
    pub fn current_slot(&self) -> Option<TupleSlot> {
        self.columns.slots().get(*self.position).copied()
    }

    /// Returns the underlying batch.
    #[must_use]
    pub fn projected_columns(&self) -> &ProjectedColumns {
        self.columns
    }
}
