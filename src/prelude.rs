//! Convenient imports for tracedb.
//!
//! This module re-exports the most commonly used types so you can get
//! started with a single import:
//!
//! ```ignore
//! use tracedb::prelude::*;
//!
//! let mut db = TraceDb::new();
//! db.begin_event_batch(Value::Null);
//! ```

// Main entry point
pub use crate::database::{TraceDb, TraceDbBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Deferred index creation
pub use crate::deferred::Deferred;

// Core types
pub use tracedb_core::{
    names, ArgKind, Argument, Event, EventType, EventTypeFlags, EventTypeRegistry, FlowId,
    Position, ScopeId, TimeMicros, Value, Zone, ZoneId,
};

// Engine views
pub use tracedb_engine::{
    DatabaseEvent, EventIndex, Flow, FlowTracker, Frame, FrameIndex, Scope, SourceInfo,
    SummaryIndex, ZoneIndex,
};

// Query types
pub use tracedb_query::{QueryResult, QueryRow, ScopeSnapshot};
