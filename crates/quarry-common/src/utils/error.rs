//! Error type shared by every Quarry crate.

use thiserror::Error;

use crate::types::{ColumnOid, SqlType, TableOid, TxId};

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building, storing or scanning tables.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The catalog has no table with this oid.
    #[error("table not found: {0}")]
    TableNotFound(TableOid),

    /// A table with this name already exists.
    #[error("table already exists: {0}")]
    TableExists(String),

    /// A requested column does not exist in the table.
    #[error("column {column} not found in table {table}")]
    ColumnNotFound {
        /// Table that was searched.
        table: TableOid,
        /// The missing column.
        column: ColumnOid,
    },

    /// A column oid appears more than once in a schema or projection.
    #[error("duplicate column: {0}")]
    DuplicateColumn(ColumnOid),

    /// A table must have at least one column.
    #[error("schema has no columns")]
    EmptySchema,

    /// A value or typed read did not match the column type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Column type.
        expected: SqlType,
        /// Type that was supplied or requested.
        found: &'static str,
    },

    /// NULL written to a column declared NOT NULL.
    #[error("null value in non-nullable column {0}")]
    NullViolation(ColumnOid),

    /// An inserted row has the wrong number of values.
    #[error("row has {found} values, table has {expected} columns")]
    RowArity {
        /// Number of table columns.
        expected: usize,
        /// Number of values in the row.
        found: usize,
    },

    /// A projected column index is outside the resolved column set.
    #[error("projected column index {index} out of range ({count} columns)")]
    ColumnIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of projected columns.
        count: usize,
    },

    /// A row index is past the rows filled in the current batch.
    #[error("row index {index} out of range ({count} rows in batch)")]
    RowIndexOutOfRange {
        /// Requested row.
        index: usize,
        /// Rows in the batch.
        count: usize,
    },

    /// A tuple slot does not address a live row.
    #[error("invalid tuple slot: block {block}, offset {offset}")]
    InvalidSlot {
        /// Block index.
        block: u32,
        /// Slot offset inside the block.
        offset: u32,
    },

    /// `init()` was called on an iterator that is already initialized.
    #[error("iterator already initialized")]
    AlreadyInitialized,

    /// The memory pool refused an allocation.
    #[error("out of memory: requested {requested} bytes, limit {limit} bytes")]
    OutOfMemory {
        /// Bytes requested.
        requested: usize,
        /// Configured pool limit.
        limit: usize,
    },

    /// A buffer layout could not be computed.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// The worker pool could not be built.
    #[error("worker pool error: {0}")]
    WorkerPool(String),

    /// The transaction is unknown or already finished.
    #[error("transaction {0} is not active")]
    TransactionNotActive(TxId),

    /// `begin` was called while the session already has a transaction.
    #[error("transaction already active")]
    TransactionAlreadyActive,

    /// `commit` or `rollback` was called without an open transaction.
    #[error("no active transaction")]
    NoActiveTransaction,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}
