//! Table catalog.
//!
//! The catalog owns every [`SqlTable`] of a database and resolves table
//! names and oids for the scan layer through [`CatalogAccessor`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use quarry_common::collections::QuarryMap;
use quarry_common::types::TableOid;
use quarry_common::utils::error::{Error, Result};
use quarry_core::execution::CatalogAccessor;
use quarry_core::storage::{Schema, SqlTable};

#[derive(Default)]
struct Tables {
    by_oid: QuarryMap<TableOid, Arc<SqlTable>>,
    by_name: QuarryMap<String, TableOid>,
}

/// In-memory registry of tables.
pub struct Catalog {
    next_oid: AtomicU32,
    block_size: u32,
    tables: RwLock<Tables>,
}

impl Catalog {
    /// Creates an empty catalog whose tables use `block_size` slots per block.
    #[must_use]
    pub fn new(block_size: u32) -> Self {
        Self {
            // TableOid::INVALID = 0
            next_oid: AtomicU32::new(1),
            block_size,
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Creates a table and returns its oid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableExists`] if the name is taken.
    pub fn create_table(&self, name: &str, schema: Schema) -> Result<TableOid> {
        let mut tables = self.tables.write();
        if tables.by_name.contains_key(name) {
            return Err(Error::TableExists(name.to_string()));
        }

        let oid = TableOid::new(self.next_oid.fetch_add(1, Ordering::Relaxed));
        let table = SqlTable::new(oid, name, schema, self.block_size)?;
        tables.by_oid.insert(oid, Arc::new(table));
        tables.by_name.insert(name.to_string(), oid);

        tracing::debug!("Created table {} ({})", name, oid);
        Ok(oid)
    }

    /// Removes a table from the catalog.
    ///
    /// Scans already holding the table keep it alive until they finish.
    pub fn drop_table(&self, name: &str) -> Option<Arc<SqlTable>> {
        let mut tables = self.tables.write();
        let oid = tables.by_name.remove(name)?;
        tables.by_oid.remove(&oid)
    }

    /// Looks a table up by name.
    #[must_use]
    pub fn table_by_name(&self, name: &str) -> Option<Arc<SqlTable>> {
        let tables = self.tables.read();
        let oid = tables.by_name.get(name)?;
        tables.by_oid.get(oid).cloned()
    }

    /// Returns all table names, sorted.
    #[must_use]
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().by_name.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of tables.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.read().by_oid.len()
    }

    /// Returns the number of slots per block for new tables.
    #[must_use]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }
}

impl CatalogAccessor for Catalog {
    fn table(&self, oid: TableOid) -> Option<Arc<SqlTable>> {
        self.tables.read().by_oid.get(&oid).cloned()
    }

    fn table_oid(&self, name: &str) -> Option<TableOid> {
        self.tables.read().by_name.get(name).copied()
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("tables", &self.list_tables())
            .field("block_size", &self.block_size)
            .finish()
    }
}
