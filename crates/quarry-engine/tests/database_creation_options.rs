//! Integration tests for database creation options.
//!
//! Verifies Config::validate(), how settings reach scans, and the
//! inspection API.

use quarry_common::types::{ColumnOid, SqlType};
use quarry_common::utils::error::Error;
use quarry_engine::test_tables::{TEST1_SIZE, generate_test_tables};
use quarry_engine::{Config, ConfigError, Database};

// --- Validation ---

#[test]
fn zero_threads_rejected() {
    assert_eq!(
        Config::in_memory().with_threads(0).validate(),
        Err(ConfigError::ZeroThreads)
    );
    let err = Database::new(Config::in_memory().with_threads(0)).unwrap_err();
    assert_eq!(
        err,
        Error::Config("threads must be greater than zero".to_string())
    );
}

#[test]
fn zero_vector_size_rejected() {
    let err = Database::new(Config::in_memory().with_vector_size(0)).unwrap_err();
    assert!(err.to_string().contains("vector_size"), "got: {err}");
}

#[test]
fn zero_memory_limit_rejected() {
    let result = Database::new(Config::in_memory().with_memory_limit(0));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn default_config_is_valid() {
    let db = Database::new(Config::default()).unwrap();
    assert!(db.worker_pool().num_threads() > 0);
    assert_eq!(db.config().vector_size, 2048);
    assert_eq!(db.config().min_grain_size, 3);
}

// --- Settings reach the scan layer ---

#[test]
fn block_size_applies_to_new_tables() {
    let db = Database::new(Config::in_memory().with_threads(2).with_block_size(500)).unwrap();
    generate_test_tables(&db).unwrap();

    let info = db.table_info("test_1").unwrap();
    assert_eq!(info.block_size, 500);
    assert_eq!(info.block_count, 20);
    assert_eq!(info.slot_count, TEST1_SIZE);
}

#[test]
fn vector_size_bounds_batches() {
    let db = Database::new(Config::in_memory().with_threads(2).with_vector_size(333)).unwrap();
    generate_test_tables(&db).unwrap();
    let table = db.table_oid("test_1").unwrap();

    let states = db.thread_states::<usize>();
    db.parallel_scan(table, &(), &states, |_, largest, tvi| {
        while tvi.advance() {
            let n = tvi.projected_columns().map_or(0, |batch| batch.num_tuples());
            *largest = (*largest).max(n);
        }
    })
    .unwrap();

    let largest = states.fold(0usize, |acc, n| acc.max(*n));
    assert!(largest > 0 && largest <= 333);
}

// --- Inspection ---

#[test]
fn stats_describe_generated_tables() {
    let db = Database::new(Config::in_memory().with_threads(2)).unwrap();
    generate_test_tables(&db).unwrap();

    let stats = db.stats();
    let names: Vec<&str> = stats.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["empty_table", "test_1", "test_2"]);
    assert_eq!(stats.worker_threads, 2);
    assert_eq!(stats.active_transactions, 0);

    let test_2 = db.table_info("test_2").unwrap();
    assert_eq!(test_2.columns[0].sql_type, SqlType::SmallInt);
    assert!(test_2.columns[1].nullable);
    assert_eq!(test_2.storage_order.last(), Some(&ColumnOid::new(1)));
}
