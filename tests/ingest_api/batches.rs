//! Batch protocol and error-handling tests
//!
//! - unmatched leaves surface as `SOURCE_ERROR` and are dropped
//! - the user-visible event count excludes internal events and leaves
//! - notifications fire only when something changed
//! - adapter errors pass through untouched

use crate::*;
use tracedb::prelude::*;

/// An unmatched leave produces one `SOURCE_ERROR`, creates no scope, and
/// leaves the user-visible count untouched
#[test]
fn test_unmatched_leave_recoverable() {
    let mut db = create_db();
    let seen = observe(&mut db);

    let batch = vec![zone_create(&db, "Z"), scope_leave(&db, 10)];
    ingest(&mut db, batch);

    assert_eq!(source_error_count(&seen), 1);
    assert_eq!(db.total_event_count(), 0);
    assert!(db.zone_by_name("Z").unwrap().scopes().is_empty());

    // Ingest continues normally afterwards
    let batch = vec![scope_enter(&db, 20, "A"), scope_leave(&db, 30)];
    ingest(&mut db, batch);
    assert_eq!(db.zone_by_name("Z").unwrap().scopes().len(), 1);
}

/// The count is ingested events minus internal events and scope leaves
#[test]
fn test_total_event_count_rule() {
    let mut db = create_db();
    db.registry_mut()
        .register_signature("app#instant(uint32 n)", EventTypeFlags::NONE)
        .unwrap();
    db.registry_mut()
        .register_signature("app#hidden", EventTypeFlags::INTERNAL)
        .unwrap();

    let batch = vec![
        zone_create(&db, "Z"),               // internal: excluded
        scope_enter(&db, 10, "A"),           // counted
        event(&db, "app#instant", 15, vec![Value::Int(1)]), // counted
        event(&db, "app#hidden", 16, vec![]), // internal: excluded
        scope_leave(&db, 20),                // leave: excluded
    ];
    ingest(&mut db, batch);

    assert_eq!(db.total_event_count(), 2);
}

/// An empty batch emits no `INVALIDATED`
#[test]
fn test_empty_batch_is_silent() {
    let mut db = create_db();
    let seen = observe(&mut db);
    ingest(&mut db, vec![]);
    assert!(seen.borrow().is_empty());
}

/// `source_error` passes through as a notification without touching state
#[test]
fn test_source_error_passthrough() {
    let mut db = create_db();
    let seen = observe(&mut db);
    db.source_error("parse failure", Some("chunk 3".to_string()));

    let events = seen.borrow();
    assert_eq!(
        events.as_slice(),
        &[DatabaseEvent::SourceError {
            message: "parse failure".to_string(),
            detail: Some("chunk 3".to_string()),
        }]
    );
    drop(events);
    assert_eq!(db.total_event_count(), 0);
}

/// `source_added` announces the source list change and invalidates
#[test]
fn test_source_added_notifications() {
    let mut db = TraceDb::new();
    let seen = observe(&mut db);
    db.source_added(1_000, Value::Null);
    assert_eq!(
        seen.borrow().as_slice(),
        &[DatabaseEvent::SourcesChanged, DatabaseEvent::Invalidated]
    );
    assert_eq!(db.timebase(), Some(1_000));
}

/// Internal events are still indexed even though they are not counted
#[test]
fn test_internal_events_are_indexed() {
    let mut db = create_db();
    ingest_nested(&mut db);

    // The zone create is internal but present in its zone's event list
    let zone = db.zone_by_name("Z").unwrap();
    assert_eq!(zone.count(), 5);
    assert_eq!(db.summary_index().count(), 5);
    assert_eq!(db.total_event_count(), 2);
}
