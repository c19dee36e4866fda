//! Integration tests for partitioned parallel scans.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use quarry_common::types::{ColumnOid, TableOid, Value};
use quarry_common::utils::error::Error;
use quarry_core::{TableVectorIterator, TupleSlot};
use quarry_core::execution::{BlockRange, CancellationToken, ScanPartitioner, WorkerPool};
use quarry_engine::test_tables::{TEST1_SIZE, TEST2_SIZE, generate_test_tables};
use quarry_engine::{Config, Database, Session};

fn setup(config: Config) -> Database {
    let db = Database::new(config).unwrap();
    generate_test_tables(&db).unwrap();
    db
}

fn small_blocks() -> Config {
    Config::in_memory()
        .with_threads(4)
        .with_block_size(64)
        .with_vector_size(50)
}

#[derive(Default)]
struct Counter {
    c: usize,
}

fn count_rows(_: &(), counter: &mut Counter, tvi: &mut TableVectorIterator<'_>) {
    while tvi.advance() {
        if let Some(mut pci) = tvi.projected_columns_iterator() {
            while pci.has_next() {
                counter.c += 1;
                pci.advance();
            }
        }
    }
}

fn scan_count(db: &Database, table: TableOid) -> usize {
    let states = db.thread_states::<Counter>();
    let report = db.parallel_scan(table, &(), &states, count_rows).unwrap();
    assert!(report.is_complete());
    states.fold(0, |acc, counter| acc + counter.c)
}

fn session_scan_count(session: &Session, table: TableOid) -> usize {
    let states = session.thread_states::<Counter>();
    session.parallel_scan(table, &(), &states, count_rows).unwrap();
    states.fold(0, |acc, counter| acc + counter.c)
}

// --- Counting ---

#[test]
fn parallel_scan_counts_every_row() {
    let db = setup(small_blocks());
    let table = db.table_oid("test_1").unwrap();

    let states = db.thread_states::<Counter>();
    let report = db.parallel_scan(table, &(), &states, count_rows).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.block_count, 157);
    assert_eq!(report.partitions, 52);
    assert_eq!(states.fold(0, |acc, counter| acc + counter.c), TEST1_SIZE);
}

#[test]
fn parallel_scan_with_default_config() {
    let db = setup(Config::in_memory().with_threads(4));
    let table = db.table_oid("test_1").unwrap();

    let states = db.thread_states::<Counter>();
    db.parallel_scan(table, &(), &states, count_rows).unwrap();
    assert_eq!(states.fold(0, |acc, counter| acc + counter.c), TEST1_SIZE);
}

#[test]
fn parallel_equals_sequential() {
    let db = setup(small_blocks());
    let table = db.table_oid("test_2").unwrap();

    let ctx = db.execution_context().unwrap();
    let mut sequential = Vec::new();
    let mut iter = TableVectorIterator::new(&ctx, table, &[ColumnOid::new(1)]);
    iter.init().unwrap();
    while iter.advance() {
        let mut pci = iter.projected_columns_iterator().unwrap();
        while pci.has_next() {
            sequential.push(pci.get::<i16>(0).unwrap().unwrap());
            pci.advance();
        }
    }

    let states = db.thread_states::<Vec<i16>>();
    db.parallel_scan(table, &(), &states, |_, seen, tvi| {
        while tvi.advance() {
            let mut pci = tvi.projected_columns_iterator().unwrap();
            while pci.has_next() {
                // All columns in storage order; col1 is last
                seen.push(pci.get::<i16>(3).unwrap().unwrap());
                pci.advance();
            }
        }
    })
    .unwrap();

    let mut parallel = states.fold(Vec::new(), |mut acc, seen| {
        acc.extend_from_slice(seen);
        acc
    });
    parallel.sort_unstable();

    assert_eq!(sequential.len(), TEST2_SIZE);
    assert_eq!(parallel, sequential);
}

#[test]
fn every_block_scanned_exactly_once() {
    let db = setup(small_blocks());
    let table = db.table_oid("test_1").unwrap();

    let states = db.thread_states::<Vec<BlockRange>>();
    let report = db
        .parallel_scan(table, &(), &states, |_, ranges, tvi| {
            ranges.push(tvi.block_range());
        })
        .unwrap();

    let mut ranges = states.fold(Vec::new(), |mut acc, r| {
        acc.extend_from_slice(r);
        acc
    });
    ranges.sort_by_key(|r| r.start);

    assert_eq!(ranges.len(), report.partitions);
    assert_eq!(ranges.first().map(|r| r.start), Some(0));
    assert_eq!(ranges.last().map(|r| r.end), Some(report.block_count));
    for pair in ranges.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
    assert!(ranges.iter().all(|r| r.len() >= 3));
}

#[test]
fn query_state_is_shared() {
    let db = setup(small_blocks());
    let table = db.table_oid("test_1").unwrap();
    let total = AtomicUsize::new(0);

    let states = db.thread_states::<()>();
    db.parallel_scan(table, &total, &states, |total, _, tvi| {
        while tvi.advance() {
            let n = tvi.projected_columns().map_or(0, |batch| batch.num_tuples());
            total.fetch_add(n, Ordering::Relaxed);
        }
    })
    .unwrap();

    assert_eq!(total.load(Ordering::Relaxed), TEST1_SIZE);
}

#[test]
fn thread_states_use_init_and_destroy_hooks() {
    let db = setup(small_blocks());
    let table = db.table_oid("test_1").unwrap();
    let destroyed = Arc::new(AtomicUsize::new(0));

    let mut states = db.thread_states::<Counter>();
    let hook = Arc::clone(&destroyed);
    states.reset(
        || Counter { c: 0 },
        move |counter| {
            hook.fetch_add(counter.c, Ordering::Relaxed);
        },
    );

    db.parallel_scan(table, &(), &states, count_rows).unwrap();
    let active = states.active_states();
    assert!(active >= 1 && active <= db.worker_pool().num_threads() + 1);

    drop(states);
    assert_eq!(destroyed.load(Ordering::Relaxed), TEST1_SIZE);
}

// --- Edge cases ---

#[test]
fn empty_table_schedules_nothing() {
    let db = setup(small_blocks());
    let table = db.table_oid("empty_table").unwrap();

    let states = db.thread_states::<Counter>();
    let report = db.parallel_scan(table, &(), &states, count_rows).unwrap();

    assert_eq!(report.block_count, 0);
    assert_eq!(report.partitions, 0);
    assert!(report.is_complete());
    assert_eq!(states.active_states(), 0);
}

#[test]
fn missing_table_is_an_error() {
    let db = setup(small_blocks());
    let states = db.thread_states::<Counter>();

    let err = db
        .parallel_scan(TableOid::new(777), &(), &states, count_rows)
        .unwrap_err();
    assert_eq!(err, Error::TableNotFound(TableOid::new(777)));
    assert_eq!(states.active_states(), 0);
}

#[test]
fn cancelled_scan_skips_partitions() {
    let db = setup(small_blocks());
    let table = db.table_oid("test_1").unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let ctx = db.execution_context().unwrap().with_cancellation(token);

    let states = db.thread_states::<Counter>();
    let report = TableVectorIterator::parallel_scan(table, &(), &states, count_rows, &ctx).unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.skipped_partitions, report.partitions);
    assert_eq!(states.fold(0, |acc, counter| acc + counter.c), 0);
}

#[test]
fn adaptive_grain_limits_partition_count() {
    let db = setup(small_blocks().with_adaptive_grain());
    let table = db.table_oid("test_1").unwrap();

    let states = db.thread_states::<Counter>();
    let report = db.parallel_scan(table, &(), &states, count_rows).unwrap();

    // 157 blocks, 4 workers, 4 partitions per worker: grain 9
    let expected = ScanPartitioner::new(3).with_workers(4).partition(157).len();
    assert_eq!(report.partitions, expected);
    assert!(report.partitions <= 4 * 4 + 1);
    assert_eq!(states.fold(0, |acc, counter| acc + counter.c), TEST1_SIZE);
}

#[test]
fn scan_buffers_released_after_scan() {
    let db = setup(small_blocks());
    let table = db.table_oid("test_1").unwrap();

    let states = db.thread_states::<Counter>();
    let report = db.parallel_scan(table, &(), &states, count_rows).unwrap();

    let stats = db.memory_pool().stats();
    assert_eq!(stats.outstanding(), 0);
    assert_eq!(stats.allocated_bytes, 0);
    assert_eq!(stats.allocation_count, report.partitions);
    assert!(stats.peak_bytes > 0);
}

#[test]
fn memory_limit_fails_partitions() {
    // Too small for even one batch buffer
    let db = setup(small_blocks().with_memory_limit(64));
    let table = db.table_oid("test_1").unwrap();

    let states = db.thread_states::<Counter>();
    let report = db.parallel_scan(table, &(), &states, count_rows).unwrap();

    assert_eq!(report.failed_partitions, report.partitions);
    assert!(
        report
            .errors
            .iter()
            .all(|(_, e)| matches!(e, Error::OutOfMemory { .. }))
    );
    assert_eq!(states.fold(0, |acc, counter| acc + counter.c), 0);
}

#[test]
fn databases_can_share_the_global_pool() {
    let pool = WorkerPool::global().unwrap();
    let a = Database::with_worker_pool(small_blocks(), Arc::clone(&pool)).unwrap();
    let b = Database::with_worker_pool(small_blocks(), Arc::clone(&pool)).unwrap();
    generate_test_tables(&a).unwrap();
    generate_test_tables(&b).unwrap();

    let unique: BTreeSet<_> = [a.table_oid("test_1"), b.table_oid("test_1")]
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(unique.len(), 1);

    for db in [&a, &b] {
        let states = db.thread_states::<Counter>();
        db.parallel_scan(db.table_oid("test_2").unwrap(), &(), &states, count_rows)
            .unwrap();
        assert_eq!(states.fold(0, |acc, counter| acc + counter.c), TEST2_SIZE);
    }
}

// --- Visibility ---

#[test]
fn open_transaction_invisible_after_unrelated_commit() {
    let db = setup(small_blocks());
    let table = db.table_oid("empty_table").unwrap();

    let mut writer = db.session();
    writer.begin_tx().unwrap();
    writer.insert(table, &[Value::Integer(1)]).unwrap();
    db.insert(table, &[Value::Integer(2)]).unwrap();

    assert_eq!(scan_count(&db, table), 1);

    writer.commit().unwrap();
    assert_eq!(scan_count(&db, table), 2);
}

#[test]
fn pending_deletes_do_not_change_other_scans() {
    let db = setup(small_blocks());
    let test_1 = db.table_oid("test_1").unwrap();
    let empty = db.table_oid("empty_table").unwrap();

    let mut writer = db.session();
    writer.begin_tx().unwrap();
    assert!(writer.delete(test_1, TupleSlot::new(0, 0)).unwrap());
    assert!(writer.delete(test_1, TupleSlot::new(100, 7)).unwrap());
    db.insert(empty, &[Value::Integer(1)]).unwrap();

    assert_eq!(scan_count(&db, test_1), TEST1_SIZE);
    assert_eq!(session_scan_count(&writer, test_1), TEST1_SIZE - 2);

    writer.commit().unwrap();
    assert_eq!(scan_count(&db, test_1), TEST1_SIZE - 2);
}

#[test]
fn rolled_back_insert_and_delete_stays_gone() {
    let db = setup(small_blocks());
    let table = db.table_oid("empty_table").unwrap();

    let mut writer = db.session();
    writer.begin_tx().unwrap();
    let slot = writer.insert(table, &[Value::Integer(1)]).unwrap();
    assert!(writer.delete(table, slot).unwrap());
    writer.rollback().unwrap();
    db.insert(table, &[Value::Integer(2)]).unwrap();

    assert_eq!(scan_count(&db, table), 1);
}
