//! Standard tables for tests and benchmarks.
//!
//! - `empty_table`: no rows, one `colA INTEGER` column.
//! - `test_1`: [`TEST1_SIZE`] rows; `colA INTEGER` counts up from zero,
//!   followed by three more INTEGER columns.
//! - `test_2`: [`TEST2_SIZE`] rows; `col1 SMALLINT` counts up from zero,
//!   then `col2 INTEGER`, `col3 BIGINT` and `col4 DOUBLE`.
//!
//! `col1` of `test_2` is the narrowest column, so it is stored last.

use quarry_common::types::{ColumnOid, SqlType, Value};
use quarry_common::utils::error::Result;
use quarry_core::storage::{Column, Schema};

use crate::database::Database;

/// Rows in `test_1`.
pub const TEST1_SIZE: usize = 10_000;

/// Rows in `test_2`.
pub const TEST2_SIZE: usize = 1_000;

/// Creates and fills `empty_table`, `test_1` and `test_2`.
///
/// Rows are bulk loaded, so every snapshot sees them.
///
/// # Errors
///
/// Returns [`Error::TableExists`](quarry_common::utils::error::Error::TableExists)
/// if the tables were already generated.
pub fn generate_test_tables(db: &Database) -> Result<()> {
    db.create_table(
        "empty_table",
        Schema::new(vec![
            Column::new(ColumnOid::new(1), "colA", SqlType::Integer).not_null(),
        ])?,
    )?;

    let test_1 = db.create_table(
        "test_1",
        Schema::new(vec![
            Column::new(ColumnOid::new(1), "colA", SqlType::Integer).not_null(),
            Column::new(ColumnOid::new(2), "colB", SqlType::Integer).not_null(),
            Column::new(ColumnOid::new(3), "colC", SqlType::Integer).not_null(),
            Column::new(ColumnOid::new(4), "colD", SqlType::Integer).not_null(),
        ])?,
    )?;
    db.bulk_load(
        test_1,
        (0..TEST1_SIZE as i32).map(|i| {
            [
                Value::Integer(i),
                Value::Integer(i % 9),
                Value::Integer((i * 7) % 9_999),
                Value::Integer((i * 31) % 99_999),
            ]
        }),
    )?;

    let test_2 = db.create_table(
        "test_2",
        Schema::new(vec![
            Column::new(ColumnOid::new(1), "col1", SqlType::SmallInt).not_null(),
            Column::new(ColumnOid::new(2), "col2", SqlType::Integer),
            Column::new(ColumnOid::new(3), "col3", SqlType::BigInt).not_null(),
            Column::new(ColumnOid::new(4), "col4", SqlType::Double).not_null(),
        ])?,
    )?;
    db.bulk_load(
        test_2,
        (0..TEST2_SIZE as i16).map(|i| {
            // Every tenth col2 is NULL
            let col2 = if i % 10 == 0 {
                Value::Null
            } else {
                Value::Integer(i32::from(i) * 3)
            };
            [
                Value::SmallInt(i),
                col2,
                Value::BigInt(i64::from(i) << 20),
                Value::Double(f64::from(i) / 4.0),
            ]
        }),
    )?;

    tracing::debug!("Generated test tables");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_tables_generated() {
        let db = Database::new(Config::in_memory().with_threads(1).with_block_size(256)).unwrap();
        generate_test_tables(&db).unwrap();

        let empty = db.catalog().table_by_name("empty_table").unwrap();
        assert_eq!(empty.block_count(), 0);

        let test_1 = db.catalog().table_by_name("test_1").unwrap();
        assert_eq!(test_1.slot_count(), TEST1_SIZE);
        assert_eq!(test_1.block_count(), 40);

        let test_2 = db.catalog().table_by_name("test_2").unwrap();
        assert_eq!(test_2.slot_count(), TEST2_SIZE);
        assert_eq!(test_2.all_column_oids().last(), Some(&ColumnOid::new(1)));
    }

    #[test]
    fn test_generate_twice_fails() {
        let db = Database::new(Config::in_memory().with_threads(1)).unwrap();
        generate_test_tables(&db).unwrap();
        assert!(generate_test_tables(&db).is_err());
    }
}
