//! Fixed-capacity storage blocks.
//!
//! A block holds up to `capacity` rows. Inside a block every column is a flat
//! array of fixed-width values plus a null bitmap, in the table's storage
//! order, so copying a run of rows into a batch is a series of slice copies.

use quarry_common::mvcc::VersionInfo;
use quarry_common::types::Value;

use super::schema::BlockLayout;

/// One column's values inside a block.
#[derive(Debug)]
struct ColumnSegment {
    /// Bytes per value.
    attr_size: usize,
    /// `capacity * attr_size` bytes, little-endian values.
    values: Vec<u8>,
    /// Null bitmap, bit set = NULL.
    nulls: Vec<u64>,
}

impl ColumnSegment {
    fn new(attr_size: usize, capacity: usize) -> Self {
        Self {
            attr_size,
            values: vec![0; capacity * attr_size],
            nulls: vec![0; capacity.div_ceil(64)],
        }
    }

    #[inline]
    fn bytes(&self, offset: usize) -> &[u8] {
        let start = offset * self.attr_size;
        &self.values[start..start + self.attr_size]
    }

    #[inline]
    fn is_null(&self, offset: usize) -> bool {
        self.nulls[offset / 64] & (1 << (offset % 64)) != 0
    }

    fn write(&mut self, offset: usize, value: &Value) {
        let start = offset * self.attr_size;
        let mask = 1u64 << (offset % 64);
        if value.is_null() {
            self.nulls[offset / 64] |= mask;
        } else {
            self.nulls[offset / 64] &= !mask;
            value.write_le(&mut self.values[start..start + self.attr_size]);
        }
    }
}

/// A block of rows in column-major layout.
#[derive(Debug)]
pub struct Block {
    /// Maximum number of rows.
    capacity: u32,
    /// Column data in storage order.
    columns: Vec<ColumnSegment>,
    /// Visibility info, one per occupied slot.
    versions: Vec<VersionInfo>,
}

impl Block {
    /// Creates an empty block for the given layout.
    #[must_use]
    pub fn new(layout: &BlockLayout, capacity: u32) -> Self {
        let columns = layout
            .columns()
            .iter()
            .map(|c| ColumnSegment::new(c.sql_type().attr_size(), capacity as usize))
            .collect();

        Self {
            capacity,
            columns,
            versions: Vec::with_capacity(capacity as usize),
        }
    }

    /// Returns the number of occupied slots.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.versions.len() as u32
    }

    /// Returns true if no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Returns the slot capacity.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns true if every slot is occupied.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Appends a row whose values are already in storage order and
    /// type-checked. Returns the slot offset.
    pub(crate) fn push_row(&mut self, values: &[Value], version: VersionInfo) -> u32 {
        debug_assert!(!self.is_full(), "push_row on a full block");
        debug_assert_eq!(values.len(), self.columns.len());

        let offset = self.versions.len();
        for (segment, value) in self.columns.iter_mut().zip(values) {
            segment.write(offset, value);
        }
        self.versions.push(version);
        offset as u32
    }

    /// Returns the visibility info of a slot.
    #[must_use]
    pub fn version(&self, offset: u32) -> Option<&VersionInfo> {
        self.versions.get(offset as usize)
    }

    /// Returns the visibility info of a slot mutably.
    pub(crate) fn version_mut(&mut self, offset: u32) -> Option<&mut VersionInfo> {
        self.versions.get_mut(offset as usize)
    }

    /// Returns the visibility info of every slot mutably.
    pub(crate) fn versions_mut(&mut self) -> impl Iterator<Item = &mut VersionInfo> {
        self.versions.iter_mut()
    }

    /// Returns the raw bytes of a value.
    #[inline]
    #[must_use]
    pub fn value_bytes(&self, column: usize, offset: u32) -> &[u8] {
        self.columns[column].bytes(offset as usize)
    }

    /// Returns whether a value is NULL.
    #[inline]
    #[must_use]
    pub fn is_null(&self, column: usize, offset: u32) -> bool {
        self.columns[column].is_null(offset as usize)
    }
}
