//! # tracedb-query
//!
//! Query string classification and evaluation over an engine database.
//!
//! A query string is classified in order:
//!
//! 1. no leading `/` and no `(` — substring/pattern filter over event
//!    names and arguments
//! 2. `/body/flags` with flags drawn from `{g, i, m}` — regex filter
//! 3. anything else — tree expression over the database node tree
//!
//! Filter queries walk every zone index over the full time range, skip
//! internal events and scope leaves (a matched scope-enter is reported as
//! its reconstructed scope), and sort rows by the database event order
//! `(time, position)`. Tree expressions evaluate against the virtual node
//! tree and return the matched node set.

#![warn(missing_docs)]

pub mod expression;
pub mod filter;
pub mod result;

pub use expression::TreeExpression;
pub use filter::{Filter, FilterKind};
pub use result::{CompiledQuery, QueryResult, QueryRow, ScopeSnapshot};

use std::time::Instant;
use thiserror::Error;
use tracedb_engine::{Database, NodeRef};

/// Errors surfaced to the `query` caller.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A `/body/flags` filter failed to compile
    #[error("invalid filter regex: {0}")]
    InvalidRegex(String),

    /// A tree expression failed to parse
    #[error("invalid tree expression: {0}")]
    InvalidExpression(String),
}

/// Classify and run a query against the database.
///
/// Queries are read-only and run between batches; results hold owned
/// snapshots and stay valid afterwards.
pub fn query(db: &Database, expression: &str) -> Result<QueryResult, QueryError> {
    assert!(!db.is_inserting(), "query during an open event batch");
    let started = Instant::now();

    let (compiled, rows) = match classify(expression)? {
        Classified::Filter(filter) => {
            let rows = run_filter(db, &filter);
            (CompiledQuery::Filter(filter), rows)
        }
        Classified::Expression(expr) => {
            let rows = expr
                .evaluate(NodeRef::root(db))
                .into_iter()
                .map(QueryRow::from_node)
                .collect();
            (CompiledQuery::Expression(expr), rows)
        }
    };

    Ok(QueryResult::new(
        expression.to_string(),
        compiled,
        started.elapsed().as_secs_f64() * 1_000.0,
        rows,
    ))
}

enum Classified {
    Filter(Filter),
    Expression(TreeExpression),
}

fn classify(expression: &str) -> Result<Classified, QueryError> {
    if !expression.starts_with('/') && !expression.contains('(') {
        return Ok(Classified::Filter(Filter::plain(expression)));
    }
    if let Some((body, flags)) = parse_regex_literal(expression) {
        return Ok(Classified::Filter(Filter::regex(expression, body, flags)?));
    }
    Ok(Classified::Expression(TreeExpression::parse(expression)?))
}

/// Match the `/<body>/<flags>` shape with flags drawn from `{g, i, m}`
fn parse_regex_literal(expression: &str) -> Option<(&str, &str)> {
    let rest = expression.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    let (body, flags) = rest.split_at(close);
    let flags = &flags[1..];
    if body.is_empty() || !flags.chars().all(|c| matches!(c, 'g' | 'i' | 'm')) {
        return None;
    }
    Some((body, flags))
}

/// Filter path: every zone, full time range, database result order.
fn run_filter(db: &Database, filter: &Filter) -> Vec<QueryRow> {
    let evaluator = filter.evaluator();
    let mut rows: Vec<QueryRow> = Vec::new();
    for zone in db.zone_indices() {
        for event in zone.events() {
            if event.is_internal() || event.event_type().is_scope_leave() {
                continue;
            }
            if evaluator.as_ref().map_or(true, |eval| eval(event)) {
                if event.event_type().is_scope_enter() {
                    if let Some(scope) = zone.scope_with_enter(event) {
                        rows.push(QueryRow::Scope(ScopeSnapshot::capture(zone, scope)));
                        continue;
                    }
                }
                rows.push(QueryRow::Event(std::sync::Arc::clone(event)));
            }
        }
    }
    rows.sort_by_key(QueryRow::order_key);
    rows
}
