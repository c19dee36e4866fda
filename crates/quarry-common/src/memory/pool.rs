//! Tracked memory pool for execution buffers.
//!
//! Scan iterators take their batch buffers from here. Unlike an epoch arena,
//! every allocation is returned individually: a [`PoolBuffer`] hands its
//! memory back when dropped, so allocate and deallocate always pair up.
//!
//! The pool does no caching of its own. It is the accounting point for
//! execution memory: current and peak usage, allocation counts and an
//! optional hard limit.

// Aligned buffers require unsafe code for memory management
#![allow(unsafe_code)]

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::utils::error::{Error, Result};

/// Memory pool that hands out aligned, zeroed buffers.
///
/// Thread-safe: many iterators allocate from one pool concurrently.
pub struct MemoryPool {
    /// Maximum bytes outstanding at once (None for unlimited).
    limit: Option<usize>,
    /// Bytes currently handed out.
    allocated: AtomicUsize,
    /// High-water mark of `allocated`.
    peak: AtomicUsize,
    /// Number of successful allocations.
    allocations: AtomicUsize,
    /// Number of buffers returned.
    deallocations: AtomicUsize,
}

impl MemoryPool {
    /// Creates an unlimited pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            limit: None,
            allocated: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            allocations: AtomicUsize::new(0),
            deallocations: AtomicUsize::new(0),
        }
    }

    /// Creates a pool that refuses to hand out more than `limit` bytes.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// Returns the configured limit, if any.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Allocates `size` zeroed bytes aligned to `align`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] if `align` is not a power of two,
    /// and [`Error::OutOfMemory`] if the pool limit would be exceeded or the
    /// system allocator fails.
    pub fn allocate_aligned(self: &Arc<Self>, size: usize, align: usize) -> Result<PoolBuffer> {
        // Zero-sized layouts are not allowed by the global allocator
        let layout = Layout::from_size_align(size.max(1), align)
            .map_err(|e| Error::InvalidLayout(format!("{size} bytes at align {align}: {e}")))?;

        self.reserve(size)?;

        // SAFETY: layout has a non-zero size
        let raw = unsafe { alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(raw) else {
            self.release(size);
            return Err(Error::OutOfMemory {
                requested: size,
                limit: self.limit.unwrap_or(usize::MAX),
            });
        };

        self.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(PoolBuffer {
            ptr,
            len: size,
            layout,
            pool: Arc::clone(self),
        })
    }

    /// Reserves `size` bytes against the limit.
    fn reserve(&self, size: usize) -> Result<()> {
        loop {
            let current = self.allocated.load(Ordering::Relaxed);
            let new_total = current.saturating_add(size);

            if let Some(limit) = self.limit
                && new_total > limit
            {
                return Err(Error::OutOfMemory {
                    requested: size,
                    limit,
                });
            }

            match self.allocated.compare_exchange_weak(
                current,
                new_total,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.peak.fetch_max(new_total, Ordering::Relaxed);
                    return Ok(());
                }
                Err(_) => continue, // Retry
            }
        }
    }

    /// Gives back `size` previously reserved bytes.
    fn release(&self, size: usize) {
        self.allocated.fetch_sub(size, Ordering::AcqRel);
    }

    /// Returns bytes currently handed out.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }

    /// Returns statistics about this pool.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            limit: self.limit,
            allocated_bytes: self.allocated.load(Ordering::Acquire),
            peak_bytes: self.peak.load(Ordering::Relaxed),
            allocation_count: self.allocations.load(Ordering::Relaxed),
            deallocation_count: self.deallocations.load(Ordering::Relaxed),
        }
    }
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPool")
            .field("limit", &self.limit)
            .field("allocated", &self.allocated.load(Ordering::Relaxed))
            .field("peak", &self.peak.load(Ordering::Relaxed))
            .finish()
    }
}

/// Statistics about a memory pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Configured limit, if any.
    pub limit: Option<usize>,
    /// Bytes currently handed out.
    pub allocated_bytes: usize,
    /// Highest value `allocated_bytes` has reached.
    pub peak_bytes: usize,
    /// Number of buffers allocated.
    pub allocation_count: usize,
    /// Number of buffers returned.
    pub deallocation_count: usize,
}

impl PoolStats {
    /// Number of buffers allocated but not yet returned.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.allocation_count - self.deallocation_count
    }
}

/// An aligned, zero-initialized byte buffer owned by one holder.
///
/// The memory goes back to its [`MemoryPool`] exactly once, when the buffer
/// is dropped. The buffer never grows or shrinks.
pub struct PoolBuffer {
    /// Start of the allocation.
    ptr: NonNull<u8>,
    /// Usable length in bytes.
    len: usize,
    /// Layout the memory was allocated with.
    layout: Layout,
    /// Pool to account the release against.
    pool: Arc<MemoryPool>,
}

impl PoolBuffer {
    /// Returns the usable length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the buffer has zero usable bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the alignment of the start of the buffer.
    #[must_use]
    pub fn align(&self) -> usize {
        self.layout.align()
    }

    /// Returns the buffer contents.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for len initialized (zeroed) bytes and we hold
        // the only handle to it
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Returns the buffer contents mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self guarantees exclusive access
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Overwrites the whole buffer with zeroes.
    pub fn zero(&mut self) {
        self.as_mut_slice().fill(0);
    }
}

impl Drop for PoolBuffer {
    fn drop(&mut self) {
        // SAFETY: We allocated this memory with the same layout
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
        self.pool.release(self.len);
        self.pool.deallocations.fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Debug for PoolBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuffer")
            .field("len", &self.len)
            .field("align", &self.layout.align())
            .finish()
    }
}

// SAFETY: PoolBuffer exclusively owns its allocation, like a Box<[u8]>
unsafe impl Send for PoolBuffer {}
unsafe impl Sync for PoolBuffer {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_aligned_and_zeroed() {
        let pool = Arc::new(MemoryPool::new());
        let buf = pool.allocate_aligned(1000, 64).unwrap();

        assert_eq!(buf.len(), 1000);
        assert_eq!(buf.as_slice().as_ptr() as usize % 64, 0);
        assert!(buf.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_drop_returns_memory_once() {
        let pool = Arc::new(MemoryPool::new());
        {
            let mut buf = pool.allocate_aligned(256, 8).unwrap();
            buf.as_mut_slice()[0] = 42;
            assert_eq!(pool.allocated_bytes(), 256);
        }

        let stats = pool.stats();
        assert_eq!(stats.allocated_bytes, 0);
        assert_eq!(stats.peak_bytes, 256);
        assert_eq!(stats.allocation_count, 1);
        assert_eq!(stats.deallocation_count, 1);
        assert_eq!(stats.outstanding(), 0);
    }

    #[test]
    fn test_limit_is_enforced() {
        let pool = Arc::new(MemoryPool::with_limit(1024));
        let first = pool.allocate_aligned(800, 8).unwrap();

        let err = pool.allocate_aligned(400, 8).unwrap_err();
        assert_eq!(
            err,
            Error::OutOfMemory {
                requested: 400,
                limit: 1024
            }
        );

        drop(first);
        assert!(pool.allocate_aligned(400, 8).is_ok());
    }

    #[test]
    fn test_invalid_alignment() {
        let pool = Arc::new(MemoryPool::new());
        assert!(matches!(
            pool.allocate_aligned(16, 3),
            Err(Error::InvalidLayout(_))
        ));
        assert_eq!(pool.allocated_bytes(), 0);
    }

    #[test]
    fn test_zero_sized_buffer() {
        let pool = Arc::new(MemoryPool::new());
        let buf = pool.allocate_aligned(0, 8).unwrap();
        assert!(buf.is_empty());
        assert!(buf.as_slice().is_empty());
    }

    #[test]
    fn test_concurrent_allocations() {
        let pool = Arc::new(MemoryPool::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let pool = Arc::clone(&pool);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    let buf = pool.allocate_aligned(128, 8).unwrap();
                    assert_eq!(buf.len(), 128);
                }
            }));
        }

        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        let stats = pool.stats();
        assert_eq!(stats.allocation_count, 800);
        assert_eq!(stats.deallocation_count, 800);
        assert_eq!(stats.allocated_bytes, 0);
    }
}
