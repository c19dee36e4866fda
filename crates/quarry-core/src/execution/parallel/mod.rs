//! Parallel scan execution.
//!
//! - [`partition`] - Splitting block ranges into partitions
//! - [`worker_pool`] - Fork-join worker pool
//! - [`thread_state`] - Per-worker private state
//! - [`scan`] - Scan tasks and the parallel scan entry point

pub mod partition;
pub mod scan;
pub mod thread_state;
pub mod worker_pool;

pub use partition::{BlockRange, DEFAULT_MIN_GRAIN_SIZE, ScanPartitioner};
pub use scan::{PartitionOutcome, ScanReport, ScanTask, parallel_scan};
pub use thread_state::ThreadStateContainer;
pub use worker_pool::WorkerPool;
