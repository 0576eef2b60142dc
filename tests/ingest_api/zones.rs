//! Zone discovery and position renumbering tests
//!
//! - zones created mid-batch join the in-flight fan-out
//! - duplicate creates are ignored
//! - zone-less events land in the default zone
//! - positions are dense across all zones after every batch

use crate::*;
use tracedb::prelude::*;

/// A zone created mid-batch receives every one of its events in the same
/// batch and is announced via `ZONES_ADDED`
#[test]
fn test_zone_created_mid_batch() {
    let mut db = create_db();
    let seen = observe(&mut db);

    let batch = vec![
        zone_create(&db, "Z2"),
        scope_enter(&db, 10, "work"),
        scope_leave(&db, 20),
    ];
    ingest(&mut db, batch);

    let zone = db.zone_by_name("Z2").unwrap();
    // zone create + enter + leave
    assert_eq!(zone.count(), 3);
    assert_eq!(zone.scopes().len(), 1);

    let added: Vec<_> = seen
        .borrow()
        .iter()
        .filter_map(|e| match e {
            DatabaseEvent::ZonesAdded(zones) => Some(zones.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(added, vec![vec![ZoneId(0)]]);
    assert!(seen.borrow().contains(&DatabaseEvent::Invalidated));
}

/// Duplicate zone creates are ignored
#[test]
fn test_duplicate_zone_create_ignored() {
    let mut db = create_db();
    let batch = vec![zone_create(&db, "Z"), zone_create(&db, "Z")];
    ingest(&mut db, batch);
    assert_eq!(db.zone_indices().len(), 1);

    // A later batch repeating the create does not announce new zones
    let seen = observe(&mut db);
    let batch = vec![zone_create(&db, "Z")];
    ingest(&mut db, batch);
    assert!(!seen
        .borrow()
        .iter()
        .any(|e| matches!(e, DatabaseEvent::ZonesAdded(_))));
}

/// Events ingested before any zone create land in the default zone
#[test]
fn test_default_zone_for_zoneless_events() {
    let mut db = create_db();
    let batch = vec![scope_enter(&db, 10, "A"), scope_leave(&db, 20)];
    ingest(&mut db, batch);

    let zone = db.zone_by_name("Default").unwrap();
    assert_eq!(zone.scopes().len(), 1);
    assert_eq!(zone.scope_at(15).unwrap().name(), "A");
}

/// Events stamped for a specific zone only appear in that zone
#[test]
fn test_events_partition_by_zone() {
    let mut db = create_db();
    db.begin_event_batch(Value::Null);
    db.trace_event(zone_create(&db, "Z1"));
    db.trace_event(zone_create(&db, "Z2"));
    let mut e = scope_enter(&db, 10, "only-z2");
    e.set_zone("Z2");
    db.trace_event(e);
    let mut e = scope_leave(&db, 20);
    e.set_zone("Z2");
    db.trace_event(e);
    db.end_event_batch();

    assert_eq!(db.zone_by_name("Z1").unwrap().scopes().len(), 0);
    assert_eq!(db.zone_by_name("Z2").unwrap().scopes().len(), 1);
}

/// Renumbering is a total order: the positions across all zones are
/// exactly `{1..N}` after every batch
#[test]
fn test_positions_dense_across_zones() {
    let mut db = create_db();
    db.begin_event_batch(Value::Null);
    db.trace_event(zone_create(&db, "Z1"));
    db.trace_event(scope_enter(&db, 10, "A"));
    db.trace_event(zone_create(&db, "Z2"));
    let mut e = scope_enter(&db, 5, "B");
    e.set_zone("Z2");
    db.trace_event(e);
    db.end_event_batch();

    let check = |db: &TraceDb, expected: usize| {
        let mut positions: Vec<Position> = db
            .zone_indices()
            .iter()
            .flat_map(|z| z.events().iter().map(|e| e.position()))
            .collect();
        positions.sort_unstable();
        assert_eq!(positions, (1..=expected as Position).collect::<Vec<_>>());
    };
    check(&db, 4);

    // A second batch renumbers everything densely again
    let batch = vec![scope_leave(&db, 30)];
    ingest(&mut db, batch);
    check(&db, 5);
}
