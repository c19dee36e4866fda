//! # quarry-core
//!
//! Storage and scan layer for Quarry: block-organized tables, vectorized
//! table iteration and partitioned parallel scans.
//!
//! This crate depends only on `quarry-common`.
//!
//! ## Modules
//!
//! - [`storage`] - Schemas, blocks and tables
//! - [`execution`] - Batches, table iterators and parallel scans

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod execution;
pub mod storage;

pub use execution::{
    ExecutionContext, ProjectedColumnsIterator, ScanReport, TableVectorIterator,
    ThreadStateContainer, WorkerPool,
};
pub use storage::{Column, Schema, SqlTable, TupleSlot};
