//! # quarry-engine
//!
//! The database entry point for Quarry: configuration, the table catalog,
//! transactions and sessions on top of the scan layer in `quarry-core`.
//!
//! ## Quick start
//!
//! ```
//! use quarry_engine::{Config, Database};
//! use quarry_engine::test_tables::{TEST1_SIZE, generate_test_tables};
//!
//! let db = Database::new(Config::in_memory().with_threads(4))?;
//! generate_test_tables(&db)?;
//!
//! let oid = db.table_oid("test_1").expect("generated");
//! let states = db.thread_states::<usize>();
//! let report = db.parallel_scan(oid, &(), &states, |_, count, iter| {
//!     while iter.advance() {
//!         *count += iter.projected_columns().map_or(0, |batch| batch.num_tuples());
//!     }
//! })?;
//!
//! assert!(report.is_complete());
//! assert_eq!(states.fold(0, |acc, n| acc + *n), TEST1_SIZE);
//! # Ok::<(), quarry_common::utils::error::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod admin;
pub mod catalog;
pub mod config;
pub mod database;
pub mod session;
pub mod test_tables;
pub mod transaction;

pub use catalog::Catalog;
pub use config::{Config, ConfigError};
pub use database::Database;
pub use session::Session;
pub use transaction::TransactionManager;
