//! Flow correlation tests
//!
//! - branch / extend / terminate chains
//! - parent back-references
//! - data materialization as a left-fold

use crate::*;
use tracedb::prelude::*;

fn flow_branch(db: &TraceDb, time: TimeMicros, id: i64, parent: i64) -> Event {
    event(
        db,
        names::FLOW_BRANCH,
        time,
        vec![Value::Int(id), Value::Int(parent), Value::Null],
    )
}

fn flow_extend(db: &TraceDb, time: TimeMicros, id: i64) -> Event {
    event(db, names::FLOW_EXTEND, time, vec![Value::Int(id), Value::Null])
}

fn flow_terminate(db: &TraceDb, time: TimeMicros, id: i64) -> Event {
    event(
        db,
        names::FLOW_TERMINATE,
        time,
        vec![Value::Int(id), Value::Null],
    )
}

fn flow_data(db: &TraceDb, time: TimeMicros, id: i64, key: &str, value: Value) -> Event {
    event(
        db,
        names::FLOW_APPEND_DATA,
        time,
        vec![Value::Int(id), Value::String(key.to_string()), value],
    )
}

/// branch(id=7, parent=0) + 2 extends + terminate
#[test]
fn test_flow_lifecycle() {
    let mut db = create_db();
    let batch = vec![
        zone_create(&db, "Z"),
        flow_branch(&db, 10, 7, 0),
        flow_extend(&db, 20, 7),
        flow_extend(&db, 30, 7),
        flow_terminate(&db, 40, 7),
    ];
    ingest(&mut db, batch);

    let flow = db.flow_tracker().flow(FlowId(7)).unwrap();
    assert!(flow.branch_event().is_some());
    assert_eq!(flow.extend_events().len(), 2);
    assert!(flow.terminate_event().is_some());
    assert_eq!(flow.parent(), None);
    assert!(flow.is_closed());
}

/// Child flows record their parent id; the parent stays independently
/// owned by the tracker
#[test]
fn test_flow_parent_chain() {
    let mut db = create_db();
    let batch = vec![
        zone_create(&db, "Z"),
        flow_branch(&db, 10, 1, 0),
        flow_branch(&db, 20, 2, 1),
        flow_branch(&db, 30, 3, 2),
    ];
    ingest(&mut db, batch);

    let tracker = db.flow_tracker();
    assert_eq!(tracker.count(), 3);
    assert_eq!(tracker.flow(FlowId(3)).unwrap().parent(), Some(FlowId(2)));
    assert_eq!(tracker.flow(FlowId(2)).unwrap().parent(), Some(FlowId(1)));
    assert_eq!(tracker.flow(FlowId(1)).unwrap().parent(), None);
}

/// `data()` is the left-fold of data events; later keys override
#[test]
fn test_flow_data_left_fold() {
    let mut db = create_db();
    let batch = vec![
        zone_create(&db, "Z"),
        flow_branch(&db, 10, 5, 0),
        flow_data(&db, 20, 5, "status", Value::String("pending".into())),
        flow_data(&db, 25, 5, "bytes", Value::Int(128)),
        flow_data(&db, 30, 5, "status", Value::String("done".into())),
    ];
    ingest(&mut db, batch);

    let data = db.flow_tracker().flow(FlowId(5)).unwrap().data();
    assert_eq!(data.len(), 2);
    assert_eq!(data.get("status"), Some(&Value::String("done".into())));
    assert_eq!(data.get("bytes"), Some(&Value::Int(128)));
}

/// Flows correlate across zones: events for one id may come from any zone
#[test]
fn test_flow_spans_zones() {
    let mut db = create_db();
    db.begin_event_batch(Value::Null);
    db.trace_event(zone_create(&db, "Z1"));
    db.trace_event(zone_create(&db, "Z2"));
    let mut e = flow_branch(&db, 10, 9, 0);
    e.set_zone("Z1");
    db.trace_event(e);
    let mut e = flow_terminate(&db, 20, 9);
    e.set_zone("Z2");
    db.trace_event(e);
    db.end_event_batch();

    let flow = db.flow_tracker().flow(FlowId(9)).unwrap();
    assert!(flow.is_closed());
}

/// Flow events after a terminate are tolerated
#[test]
fn test_flow_events_after_close_tolerated() {
    let mut db = create_db();
    let batch = vec![
        zone_create(&db, "Z"),
        flow_branch(&db, 10, 4, 0),
        flow_terminate(&db, 20, 4),
        flow_extend(&db, 30, 4),
    ];
    ingest(&mut db, batch);

    let flow = db.flow_tracker().flow(FlowId(4)).unwrap();
    assert!(flow.is_closed());
    assert_eq!(flow.extend_events().len(), 1);
}
