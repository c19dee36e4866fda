//! Tuple addresses and scan cursors.

use std::fmt;

/// Physical address of one row: block index plus slot offset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TupleSlot {
    block: u32,
    offset: u32,
}

impl TupleSlot {
    /// Creates a tuple slot.
    #[inline]
    #[must_use]
    pub const fn new(block: u32, offset: u32) -> Self {
        Self { block, offset }
    }

    /// Returns the block index.
    #[inline]
    #[must_use]
    pub const fn block(self) -> u32 {
        self.block
    }

    /// Returns the offset within the block.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.offset
    }
}

impl fmt::Debug for TupleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TupleSlot({}:{})", self.block, self.offset)
    }
}

/// A position in a table's slot sequence, used as one end of a scan range.
///
/// Cursors compare for equality only. A scan runs from a begin cursor until
/// it equals the end cursor; there is deliberately no ordering, so range
/// checks cannot depend on anything but convergence.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SlotCursor {
    block: u32,
    offset: u32,
}

impl SlotCursor {
    /// Cursor at the first slot of `block`.
    #[inline]
    #[must_use]
    pub(crate) const fn at_block(block: u32) -> Self {
        Self { block, offset: 0 }
    }

    /// Returns the block the cursor points into.
    #[inline]
    #[must_use]
    pub const fn block(self) -> u32 {
        self.block
    }

    /// Returns the slot the cursor points at.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> TupleSlot {
        TupleSlot::new(self.block, self.offset)
    }

    /// Moves to the next slot in the same block.
    #[inline]
    pub(crate) fn step(&mut self) {
        self.offset += 1;
    }

    /// Moves to the first slot of the next block.
    #[inline]
    pub(crate) fn next_block(&mut self) {
        self.block += 1;
        self.offset = 0;
    }

    /// Returns the offset within the current block.
    #[inline]
    pub(crate) const fn offset(self) -> u32 {
        self.offset
    }
}

impl fmt::Debug for SlotCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotCursor({}:{})", self.block, self.offset)
    }
}
