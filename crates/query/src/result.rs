//! Query results
//!
//! A [`QueryResult`] carries the original expression, the compiled form,
//! the evaluation duration, and the result rows. Rows hold owned snapshots
//! (events via their shared handles, scopes as copied summaries) so results
//! stay usable while new batches arrive.

use crate::expression::TreeExpression;
use crate::filter::Filter;
use std::sync::Arc;
use tracedb_core::{Event, ScopeId, TimeMicros, Zone};
use tracedb_engine::{NodeRef, Scope, ZoneIndex};

/// The compiled form of a query.
#[derive(Debug)]
pub enum CompiledQuery {
    /// A substring or regex filter
    Filter(Filter),
    /// A tree expression
    Expression(TreeExpression),
}

/// A copied summary of one scope, detached from the owning index.
#[derive(Debug, Clone)]
pub struct ScopeSnapshot {
    /// Owning zone identity
    pub zone: Zone,
    /// Arena id within the owning zone index
    pub id: ScopeId,
    /// Scope name
    pub name: String,
    /// Nesting depth
    pub depth: u32,
    /// Enter event
    pub enter: Arc<Event>,
    /// Leave event, None while open
    pub leave: Option<Arc<Event>>,
    /// `leave.time - enter.time`, None while open
    pub total_duration: Option<TimeMicros>,
    /// Self time excluding direct children, None while open
    pub user_duration: Option<TimeMicros>,
}

impl ScopeSnapshot {
    pub(crate) fn capture(zone: &ZoneIndex, scope: &Scope) -> Self {
        Self {
            zone: zone.zone().clone(),
            id: scope.id(),
            name: scope.name().to_string(),
            depth: scope.depth(),
            enter: Arc::clone(scope.enter_event()),
            leave: scope.leave_event().cloned(),
            total_duration: scope.total_duration(),
            user_duration: scope.user_duration(),
        }
    }
}

/// One result row.
#[derive(Debug, Clone)]
pub enum QueryRow {
    /// The database root node
    Database,
    /// A zone node
    Zone(Zone),
    /// A scope (a matched scope-enter is reported as its scope)
    Scope(ScopeSnapshot),
    /// A plain event
    Event(Arc<Event>),
}

impl QueryRow {
    pub(crate) fn from_node(node: NodeRef<'_>) -> QueryRow {
        if let Some(event) = node.as_event() {
            QueryRow::Event(Arc::clone(event))
        } else if let Some((zone, scope)) = node.as_scope() {
            QueryRow::Scope(ScopeSnapshot::capture(zone, scope))
        } else if let Some(zone) = node.as_zone() {
            QueryRow::Zone(zone.zone().clone())
        } else {
            QueryRow::Database
        }
    }

    /// The row's time and position for database ordering
    pub(crate) fn order_key(&self) -> (TimeMicros, u32) {
        match self {
            QueryRow::Database => (TimeMicros::MIN, 0),
            QueryRow::Zone(_) => (TimeMicros::MIN, 0),
            QueryRow::Scope(scope) => (scope.enter.time(), scope.enter.position()),
            QueryRow::Event(event) => (event.time(), event.position()),
        }
    }

    /// The matched scope, if this row is one
    pub fn as_scope(&self) -> Option<&ScopeSnapshot> {
        match self {
            QueryRow::Scope(s) => Some(s),
            _ => None,
        }
    }

    /// The matched event, if this row is one
    pub fn as_event(&self) -> Option<&Arc<Event>> {
        match self {
            QueryRow::Event(e) => Some(e),
            _ => None,
        }
    }
}

/// The outcome of one `query` call.
#[derive(Debug)]
pub struct QueryResult {
    expression: String,
    compiled: CompiledQuery,
    duration_ms: f64,
    rows: Vec<QueryRow>,
}

impl QueryResult {
    pub(crate) fn new(
        expression: String,
        compiled: CompiledQuery,
        duration_ms: f64,
        rows: Vec<QueryRow>,
    ) -> Self {
        Self {
            expression,
            compiled,
            duration_ms,
            rows,
        }
    }

    /// The original query string
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The compiled form the string classified to
    pub fn compiled(&self) -> &CompiledQuery {
        &self.compiled
    }

    /// Evaluation duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Result rows
    pub fn rows(&self) -> &[QueryRow] {
        &self.rows
    }

    /// Number of result rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if nothing matched
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
