//! Admin API types for database inspection.

use quarry_common::memory::PoolStats;
use quarry_common::types::{ColumnOid, SqlType, TableOid};
use quarry_core::storage::SqlTable;
use serde::{Deserialize, Serialize};

/// Description of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column oid.
    pub oid: ColumnOid,
    /// Column name.
    pub name: String,
    /// Column type.
    pub sql_type: SqlType,
    /// Whether NULL is allowed.
    pub nullable: bool,
}

/// Description and size of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table oid.
    pub oid: TableOid,
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnInfo>,
    /// Column oids in storage order.
    pub storage_order: Vec<ColumnOid>,
    /// Tuple slots per block.
    pub block_size: u32,
    /// Number of blocks.
    pub block_count: u32,
    /// Number of slots in use, including deleted rows.
    pub slot_count: usize,
}

impl From<&SqlTable> for TableInfo {
    fn from(table: &SqlTable) -> Self {
        Self {
            oid: table.oid(),
            name: table.name().to_string(),
            columns: table
                .schema()
                .columns()
                .iter()
                .map(|c| ColumnInfo {
                    oid: c.oid(),
                    name: c.name().to_string(),
                    sql_type: c.sql_type(),
                    nullable: c.is_nullable(),
                })
                .collect(),
            storage_order: table.all_column_oids(),
            block_size: table.block_size(),
            block_count: table.block_count(),
            slot_count: table.slot_count(),
        }
    }
}

/// Scan buffer usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInfo {
    /// Configured limit in bytes, if any.
    pub limit: Option<usize>,
    /// Bytes held by live batch buffers.
    pub allocated_bytes: usize,
    /// High-water mark of `allocated_bytes`.
    pub peak_bytes: usize,
    /// Buffers allocated but not yet returned.
    pub outstanding_buffers: usize,
}

impl From<PoolStats> for MemoryInfo {
    fn from(stats: PoolStats) -> Self {
        Self {
            limit: stats.limit,
            allocated_bytes: stats.allocated_bytes,
            peak_bytes: stats.peak_bytes,
            outstanding_buffers: stats.outstanding(),
        }
    }
}

/// Database statistics returned by `db.stats()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    /// Every table, sorted by name.
    pub tables: Vec<TableInfo>,
    /// Number of open transactions.
    pub active_transactions: usize,
    /// Latest committed epoch.
    pub current_epoch: u64,
    /// Worker threads available to parallel scans.
    pub worker_threads: usize,
    /// Scan buffer usage.
    pub memory: MemoryInfo,
}

impl DatabaseStats {
    /// Returns the number of tables.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Returns the total number of slots across all tables.
    #[must_use]
    pub fn total_slots(&self) -> usize {
        self.tables.iter().map(|t| t.slot_count).sum()
    }
}
