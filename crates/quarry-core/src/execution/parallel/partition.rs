//! Splitting a table's block sequence into parallel scan partitions.

use std::fmt;

/// Minimum number of blocks per partition.
pub const DEFAULT_MIN_GRAIN_SIZE: usize = 3;

/// Target partitions per worker when the grain is derived from the worker
/// count.
const PARTITIONS_PER_WORKER: u32 = 4;

/// A half-open range of block indices `[start, end)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRange {
    /// First block in the range.
    pub start: u32,
    /// One past the last block in the range.
    pub end: u32,
}

impl BlockRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Returns the number of blocks in the range.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the range has no blocks.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Computes disjoint block ranges for a parallel scan.
///
/// Partitions cover `[0, block_count)` exactly, in ascending order. Blocks
/// are spread evenly, so when the table has at least `grain` blocks every
/// partition has at least `grain` blocks; a smaller table becomes a single
/// partition.
#[derive(Debug, Clone, Copy)]
pub struct ScanPartitioner {
    min_grain: u32,
    workers: Option<u32>,
}

impl ScanPartitioner {
    /// Creates a partitioner with a fixed minimum grain. A grain of zero is
    /// treated as one.
    #[must_use]
    pub fn new(min_grain: usize) -> Self {
        Self {
            min_grain: u32::try_from(min_grain).unwrap_or(u32::MAX).max(1),
            workers: None,
        }
    }

    /// Derives the grain from the block count so that each of `workers`
    /// threads gets a few partitions. The minimum grain still applies.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(u32::try_from(workers).unwrap_or(u32::MAX).max(1));
        self
    }

    /// Returns the grain used for a table of `block_count` blocks.
    #[must_use]
    pub fn grain_size(&self, block_count: u32) -> u32 {
        match self.workers {
            Some(workers) => {
                let target = workers.saturating_mul(PARTITIONS_PER_WORKER);
                self.min_grain.max(block_count / target)
            }
            None => self.min_grain,
        }
    }

    /// Splits `[0, block_count)` into partitions.
    #[must_use]
    pub fn partition(&self, block_count: u32) -> Vec<BlockRange> {
        if block_count == 0 {
            return Vec::new();
        }

        let grain = self.grain_size(block_count);
        let parts = (block_count / grain).max(1);
        let base = block_count / parts;
        let extra = block_count % parts;

        let mut ranges = Vec::with_capacity(parts as usize);
        let mut start = 0;
        for i in 0..parts {
            let len = base + u32::from(i < extra);
            ranges.push(BlockRange::new(start, start + len));
            start += len;
        }
        debug_assert_eq!(start, block_count);
        ranges
    }
}

impl Default for ScanPartitioner {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_GRAIN_SIZE)
    }
}
