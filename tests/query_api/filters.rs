//! Filter query tests
//!
//! - plain and regex classification
//! - scope-enter events surface as their scopes
//! - result ordering and the internal-event exclusion

use crate::*;
use tracedb::prelude::*;

/// Plain filter matching one scope name
#[test]
fn test_plain_filter_matches_scope() {
    let db = nested_db();
    let result = db.query("A").unwrap();
    assert_eq!(scope_names(&result), vec!["A"]);
    assert_eq!(result.expression(), "A");
}

/// Anchored regex filter
#[test]
fn test_regex_filter_exact() {
    let db = nested_db();
    let result = db.query("/^B$/").unwrap();
    assert_eq!(scope_names(&result), vec!["B"]);
}

/// `.*` matches every visible row, sorted by enter time
#[test]
fn test_match_all_sorted() {
    let db = nested_db();
    let result = db.query(".*").unwrap();

    // scope A, the checkpoint instant, scope B; leaves and the internal
    // zone create are hidden
    assert_eq!(result.len(), 3);
    assert_eq!(scope_names(&result), vec!["A", "B"]);

    let keys: Vec<_> = result
        .rows()
        .iter()
        .map(|row| match row {
            QueryRow::Scope(s) => (s.enter.time(), s.enter.position()),
            QueryRow::Event(e) => (e.time(), e.position()),
            other => panic!("unexpected row {other:?}"),
        })
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

/// Filters match argument values, not only names
#[test]
fn test_filter_matches_arguments() {
    let db = nested_db();
    let result = db.query("mid").unwrap();
    assert_eq!(result.len(), 1);
    let event = result.rows()[0].as_event().unwrap();
    assert_eq!(event.event_type().name(), "app#checkpoint");
}

/// No internal event ever appears in a filter result
#[test]
fn test_filter_hides_internal_events() {
    let db = nested_db();
    let result = db.query("zone").unwrap();
    for row in result.rows() {
        if let Some(event) = row.as_event() {
            assert!(!event.is_internal());
        }
    }
}

/// Case-insensitive plain filters
#[test]
fn test_plain_filter_case_insensitive() {
    let db = nested_db();
    let result = db.query("a").unwrap();
    assert!(scope_names(&result).contains(&"A".to_string()));
}

/// Unparsable regex filters surface as errors
#[test]
fn test_unparsable_regex_is_error() {
    let db = nested_db();
    let err = db.query("/(/").unwrap_err();
    assert!(err.is_query());
    assert!(err.to_string().contains("regex"));
}

/// The result records its compiled form and a non-negative duration
#[test]
fn test_result_metadata() {
    let db = nested_db();
    let result = db.query("A").unwrap();
    assert!(matches!(
        result.compiled(),
        tracedb::query::CompiledQuery::Filter(_)
    ));
    assert!(result.duration_ms() >= 0.0);
    assert!(!result.is_empty());
}

/// An empty database yields empty results, not errors
#[test]
fn test_query_on_empty_database() {
    let db = TraceDb::new();
    let result = db.query(".*").unwrap();
    assert!(result.is_empty());
}
