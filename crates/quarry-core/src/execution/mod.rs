//! Vectorized scan execution.
//!
//! - [`projected_columns`] - Fixed-capacity columnar batches
//! - [`projected_columns_iterator`] - Row cursor over a batch
//! - [`table_vector_iterator`] - Sequential batch-at-a-time table scans
//! - [`context`] - Catalog access, snapshot and pools for one query
//! - [`parallel`] - Partitioned parallel scans

pub mod context;
pub mod parallel;
pub mod projected_columns;
pub mod projected_columns_iterator;
pub mod table_vector_iterator;

pub use context::{CancellationToken, CatalogAccessor, ExecutionContext};
pub use parallel::{
    BlockRange, ScanPartitioner, ScanReport, ThreadStateContainer, WorkerPool, parallel_scan,
};
pub use projected_columns::{
    DEFAULT_VECTOR_SIZE, MAX_VECTOR_SIZE, ProjectedColumns, ProjectedColumnsInitializer,
};
pub use projected_columns_iterator::ProjectedColumnsIterator;
pub use table_vector_iterator::TableVectorIterator;
