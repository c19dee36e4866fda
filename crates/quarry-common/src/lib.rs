//! # quarry-common
//!
//! Foundation types shared by every Quarry crate.
//!
//! ## Modules
//!
//! - [`types`] - Identifiers, SQL types and values
//! - [`memory`] - Tracked pool for execution buffers
//! - [`mvcc`] - Row visibility metadata
//! - [`collections`] - Hash map/set aliases
//! - [`utils`] - Error type

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collections;
pub mod memory;
pub mod mvcc;
pub mod types;
pub mod utils;

pub use types::{ColumnOid, ColumnValue, EpochId, SqlType, TableOid, TxId, Value};
pub use utils::error::{Error, Result};
