//! Table schemas and their physical column order.

use quarry_common::collections::{QuarryMap, quarry_map_with_capacity, quarry_set};
use quarry_common::types::{ColumnOid, SqlType};
use quarry_common::utils::error::{Error, Result};

/// One column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    oid: ColumnOid,
    name: String,
    sql_type: SqlType,
    nullable: bool,
}

impl Column {
    /// Creates a nullable column.
    #[must_use]
    pub fn new(oid: ColumnOid, name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            oid,
            name: name.into(),
            sql_type,
            nullable: true,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Returns the column oid.
    #[must_use]
    pub fn oid(&self) -> ColumnOid {
        self.oid
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column type.
    #[must_use]
    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    /// Returns whether the column accepts NULL.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// The columns of a table, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Creates a schema.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::EmptySchema`] for no columns and
    /// [`Error::DuplicateColumn`] if two columns share an oid.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::EmptySchema);
        }

        let mut seen = quarry_set();
        for column in &columns {
            if !seen.insert(column.oid) {
                return Err(Error::DuplicateColumn(column.oid));
            }
        }

        Ok(Self { columns })
    }

    /// Returns the columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Always false; a schema has at least one column.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Looks up a column by oid.
    #[must_use]
    pub fn column(&self, oid: ColumnOid) -> Option<&Column> {
        self.columns.iter().find(|c| c.oid == oid)
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Physical arrangement of a table's columns inside its blocks.
///
/// Columns are stored widest first (ties broken by oid), so 8-byte values
/// come before 4-byte values and so on. This storage order is the table's
/// natural column order: it is what a scan projects when no columns are
/// requested.
#[derive(Debug, Clone)]
pub struct BlockLayout {
    /// Columns in storage order.
    columns: Vec<Column>,
    /// Column oid -> storage position.
    positions: QuarryMap<ColumnOid, usize>,
}

impl BlockLayout {
    /// Computes the layout for a schema.
    #[must_use]
    pub fn new(schema: &Schema) -> Self {
        let mut columns = schema.columns().to_vec();
        columns.sort_by(|a, b| {
            b.sql_type
                .attr_size()
                .cmp(&a.sql_type.attr_size())
                .then(a.oid.cmp(&b.oid))
        });

        let mut positions = quarry_map_with_capacity(columns.len());
        for (pos, column) in columns.iter().enumerate() {
            positions.insert(column.oid, pos);
        }

        Self { columns, positions }
    }

    /// Returns the columns in storage order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns the storage position of a column.
    #[must_use]
    pub fn position(&self, oid: ColumnOid) -> Option<usize> {
        self.positions.get(&oid).copied()
    }

    /// Returns the column at a storage position.
    #[must_use]
    pub fn column_at(&self, pos: usize) -> &Column {
        &self.columns[pos]
    }

    /// Returns every column oid in storage order.
    #[must_use]
    pub fn column_oids(&self) -> Vec<ColumnOid> {
        self.columns.iter().map(Column::oid).collect()
    }
}
