//! Tree-expression query tests
//!
//! - path navigation over the database/zone/scope/event tree
//! - descendant axis and predicates
//! - malformed expressions surface as errors

use crate::*;
use tracedb::prelude::*;

/// Absolute path down to a nested scope
#[test]
fn test_absolute_path() {
    let db = nested_db();
    let result = db.query("/main/A/B").unwrap();
    assert_eq!(scope_names(&result), vec!["B"]);
}

/// `*` selects all children of the matched set
#[test]
fn test_wildcard_step() {
    let db = nested_db();
    let result = db.query("/main/*").unwrap();
    // The only root child of the zone is scope A
    assert_eq!(scope_names(&result), vec!["A"]);
}

/// `//` selects descendants anywhere below
#[test]
fn test_descendant_axis() {
    let db = nested_db();
    let result = db.query("//B").unwrap();
    assert_eq!(scope_names(&result), vec!["B"]);

    let everything = db.query("/main//*").unwrap();
    // A, the checkpoint event, B
    assert_eq!(everything.len(), 3);
}

/// Attribute predicates filter the step result
#[test]
fn test_attribute_predicates() {
    let db = nested_db();

    let result = db.query("//*[@depth=1]").unwrap();
    assert_eq!(scope_names(&result), vec!["B"]);

    let result = db.query("/main/A[@totalDuration=40]").unwrap();
    assert_eq!(scope_names(&result), vec!["A"]);

    let result = db.query("/main/A[@totalDuration=41]").unwrap();
    assert!(result.is_empty());

    let result = db.query("/*[@type='script']").unwrap();
    assert_eq!(result.len(), 1);
    assert!(matches!(result.rows()[0], QueryRow::Zone(_)));
}

/// Position predicates are 1-based over the step result
#[test]
fn test_position_predicate() {
    let db = nested_db();
    let result = db.query("/main/A/*[1]").unwrap();
    assert_eq!(result.len(), 1);
    // First child of A in document order is the checkpoint at t=15
    let event = result.rows()[0].as_event().unwrap();
    assert_eq!(event.time(), 15);
}

/// `..` walks back to the parent
#[test]
fn test_parent_step() {
    let db = nested_db();
    let result = db.query("//B/..").unwrap();
    assert_eq!(scope_names(&result), vec!["A"]);
}

/// Events are leaves addressable by their type name
#[test]
fn test_event_leaf_by_name() {
    let db = nested_db();
    let result = db.query("//app#checkpoint").unwrap();
    assert_eq!(result.len(), 1);
    let event = result.rows()[0].as_event().unwrap();
    assert_eq!(event.arg("label"), Some(&Value::String("mid".into())));
}

/// Malformed expressions surface as errors
#[test]
fn test_malformed_expression_is_error() {
    let db = nested_db();
    assert!(db.query("/main/[@broken").is_err());
    assert!(db.query("/main///B").is_err());
    assert!(db.query("/main/A[0]").is_err());
}

/// The compiled form is the parsed expression
#[test]
fn test_expression_result_metadata() {
    let db = nested_db();
    let result = db.query("/main/A").unwrap();
    match result.compiled() {
        tracedb::query::CompiledQuery::Expression(expr) => {
            assert_eq!(expr.source(), "/main/A");
        }
        other => panic!("expected a tree expression, got {other:?}"),
    }
}
