//! Memory allocation for execution buffers.
//!
//! - [`pool`] - Tracked pool of aligned buffers, returned on drop

pub mod pool;

pub use pool::{MemoryPool, PoolBuffer, PoolStats};
