//! Per-name and summary index tests
//!
//! - `create_event_index` is idempotent and completes synchronously
//! - indices created after ingest are back-filled
//! - summary counts, first/last times, and bucket iteration

use crate::*;
use tracedb::prelude::*;

/// Two creations with the same name return the same index
#[test]
fn test_create_event_index_idempotent() {
    let mut db = create_db();
    ingest_nested(&mut db);

    let first = db.create_event_index(names::SCOPE_ENTER);
    assert!(first.is_ready());
    let first = first.wait();
    let second = db.create_event_index(names::SCOPE_ENTER).wait();
    assert_eq!(first, second);
}

/// An index created after ingest sees the events that were already there
#[test]
fn test_event_index_backfilled() {
    let mut db = create_db();
    ingest_nested(&mut db);

    db.create_event_index(names::SCOPE_ENTER);
    let index = db.get_event_index(names::SCOPE_ENTER).unwrap();
    assert_eq!(index.count(), 2);
    let times: Vec<_> = index.events().iter().map(|e| e.time()).collect();
    assert_eq!(times, vec![10, 20]);
}

/// An existing index keeps receiving events from later batches
#[test]
fn test_event_index_receives_later_batches() {
    let mut db = create_db();
    ingest_nested(&mut db);
    db.create_event_index(names::SCOPE_ENTER);

    let batch = vec![scope_enter(&db, 60, "C"), scope_leave(&db, 70)];
    ingest(&mut db, batch);

    let index = db.get_event_index(names::SCOPE_ENTER).unwrap();
    assert_eq!(index.count(), 3);

    let mut seen = Vec::new();
    index.for_each(15, 100, |e| seen.push(e.time()));
    assert_eq!(seen, vec![20, 60]);
}

/// `get_event_index` returns None for names never created
#[test]
fn test_get_event_index_unknown() {
    let db = TraceDb::new();
    assert!(db.get_event_index("never#created").is_none());
}

/// Summary first/last times and totals cover the whole stream
#[test]
fn test_summary_stream_bounds() {
    let mut db = create_db();
    ingest_nested(&mut db);

    assert_eq!(db.first_event_time(), Some(0)); // the zone create at t=0
    assert_eq!(db.last_event_time(), Some(50));
    assert_eq!(db.summary_index().count(), 5);
}

/// Bucket iteration over a narrow-granularity summary
#[test]
fn test_summary_buckets() {
    let mut db = TraceDb::builder().summary_granularity_shift(5).build(); // 32us buckets
    db.source_added(0, Value::Null);
    ingest_nested(&mut db);

    let mut buckets = Vec::new();
    db.summary_index()
        .for_each_bucket(0, 64, |start, bucket| buckets.push((start, bucket.count())));
    // events at 0, 10, 20, 30 share the [0, 32) bucket; the leave at 50
    // falls in [32, 64)
    assert_eq!(buckets, vec![(0, 4), (32, 1)]);
}

/// Sources accumulate and the common timebase is their minimum
#[test]
fn test_sources_and_timebase() {
    let mut db = TraceDb::new();
    assert_eq!(db.timebase(), None);
    db.source_added(2_000, Value::String("tab 1".into()));
    db.source_added(1_500, Value::String("tab 2".into()));
    assert_eq!(db.sources().len(), 2);
    assert_eq!(db.timebase(), Some(1_500));
}
