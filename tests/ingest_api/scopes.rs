//! Scope reconstruction tests
//!
//! - nested scopes and derived durations
//! - out-of-order batches produce the same forest
//! - scope lookup by time
//! - forest invariants after every batch

use crate::*;
use tracedb::prelude::*;

/// Single zone, nested scopes: durations and the user-visible count
#[test]
fn test_nested_scopes_durations() {
    let mut db = create_db();
    ingest_nested(&mut db);

    let zone = db.zone_by_name("Z").unwrap();
    assert_eq!(zone.scopes().len(), 2);

    let a = zone.scope(ScopeId(0));
    assert_eq!(a.name(), "A");
    assert_eq!(a.total_duration(), Some(40));
    assert_eq!(a.user_duration(), Some(30));

    let b = zone.scope(ScopeId(1));
    assert_eq!(b.name(), "B");
    assert_eq!(b.total_duration(), Some(10));
    assert_eq!(b.user_duration(), Some(10));
    assert_eq!(b.parent(), Some(a.id()));

    // The two scope leaves and the internal zone create are excluded.
    assert_eq!(db.total_event_count(), 2);
}

/// Events delivered in reverse time order within one batch rebuild the
/// same forest as in-order delivery
#[test]
fn test_out_of_order_batch_same_forest() {
    let mut in_order = create_db();
    ingest_nested(&mut in_order);

    let mut reversed = create_db();
    let batch = vec![
        zone_create(&reversed, "Z"),
        scope_leave(&reversed, 50),
        scope_leave(&reversed, 30),
        scope_enter(&reversed, 20, "B"),
        scope_enter(&reversed, 10, "A"),
    ];
    ingest(&mut reversed, batch);

    for db in [&in_order, &reversed] {
        let zone = db.zone_by_name("Z").unwrap();
        assert_eq!(zone.scopes().len(), 2);
        let a = zone.scope(ScopeId(0));
        let b = zone.scope(ScopeId(1));
        assert_eq!((a.name(), a.total_duration(), a.user_duration()), ("A", Some(40), Some(30)));
        assert_eq!((b.name(), b.total_duration(), b.user_duration()), ("B", Some(10), Some(10)));
        assert_eq!(b.parent(), Some(a.id()));
    }
}

/// A scope left open in one batch is closed by a later batch
#[test]
fn test_scope_stays_open_across_batches() {
    let mut db = create_db();
    let batch = vec![zone_create(&db, "Z"), scope_enter(&db, 10, "A")];
    ingest(&mut db, batch);
    {
        let a = db.zone_by_name("Z").unwrap().scope(ScopeId(0));
        assert!(a.leave_event().is_none());
        assert_eq!(a.total_duration(), None);
        assert_eq!(a.user_duration(), None);
        assert!(a.contains(i64::MAX / 2));
    }

    let batch = vec![scope_leave(&db, 75)];
    ingest(&mut db, batch);
    let a = db.zone_by_name("Z").unwrap().scope(ScopeId(0));
    assert_eq!(a.total_duration(), Some(65));
}

/// A late batch that nests inside an already-closed scope rewinds and
/// reattaches correctly
#[test]
fn test_late_nested_pair_reattaches() {
    let mut db = create_db();
    let batch = vec![
        zone_create(&db, "Z"),
        scope_enter(&db, 10, "A"),
        scope_leave(&db, 50),
    ];
    ingest(&mut db, batch);

    let batch = vec![scope_enter(&db, 20, "B"), scope_leave(&db, 30)];
    ingest(&mut db, batch);

    let zone = db.zone_by_name("Z").unwrap();
    assert_eq!(zone.scopes().len(), 2);
    let a = zone.root_scopes().next().unwrap();
    assert_eq!(a.name(), "A");
    assert_eq!(a.child_count(), 1);
    assert_eq!(a.user_duration(), Some(30));
}

/// `scope_at` returns the innermost scope over the half-open extent
#[test]
fn test_scope_at_innermost() {
    let mut db = create_db();
    ingest_nested(&mut db);
    let zone = db.zone_by_name("Z").unwrap();

    assert!(zone.scope_at(5).is_none());
    assert_eq!(zone.scope_at(10).unwrap().name(), "A");
    assert_eq!(zone.scope_at(25).unwrap().name(), "B");
    assert_eq!(zone.scope_at(30).unwrap().name(), "A");
    assert!(zone.scope_at(50).is_none());
}

/// Invariant sweep over a deeper session:
/// `user = total - sum(child totals)` and `user >= 0` for every closed
/// scope; event times non-decreasing and positions strictly increasing
#[test]
fn test_forest_invariants() {
    let mut db = create_db();
    let batch = vec![
        zone_create(&db, "Z"),
        scope_enter(&db, 0, "frame"),
        scope_enter(&db, 5, "update"),
        scope_enter(&db, 6, "physics"),
        scope_leave(&db, 14),
        scope_enter(&db, 15, "ai"),
        scope_leave(&db, 22),
        scope_leave(&db, 25),
        scope_enter(&db, 26, "render"),
        scope_leave(&db, 47),
        scope_leave(&db, 50),
    ];
    ingest(&mut db, batch);

    let zone = db.zone_by_name("Z").unwrap();
    assert_eq!(zone.scopes().len(), 5);
    for scope in zone.scopes() {
        let total = scope.total_duration().unwrap();
        let children_total: i64 = zone
            .scopes()
            .iter()
            .filter(|s| s.parent() == Some(scope.id()))
            .map(|s| s.total_duration().unwrap())
            .sum();
        assert_eq!(scope.user_duration(), Some(total - children_total));
        assert!(scope.user_duration().unwrap() >= 0);
    }

    let events = zone.events();
    for pair in events.windows(2) {
        assert!(pair[0].time() <= pair[1].time());
        assert!(pair[0].position() < pair[1].position());
    }
}
