//! # tracedb
//!
//! In-memory event-trace analysis database.
//!
//! tracedb ingests streams of timestamped tracing events — scope
//! enter/leave pairs, zone creations, instant events, asynchronous flow
//! markers — from instrumented sources, reconstructs a hierarchical
//! execution model, and exposes it for time-range iteration and query.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tracedb::prelude::*;
//!
//! let mut db = TraceDb::new();
//! db.source_added(timebase_us, Value::Null);
//!
//! // The source adapter parses the wire format and drives batches:
//! db.begin_event_batch(Value::Null);
//! for event in parsed {
//!     db.trace_event(event);
//! }
//! db.end_event_batch();
//!
//! // Read the model between batches:
//! for zone in db.zone_indices() {
//!     for scope in zone.root_scopes() {
//!         println!("{}: {:?}us", scope.name(), scope.total_duration());
//!     }
//! }
//!
//! // Or query it:
//! let slow = db.query("/render.*/i")?;
//! ```
//!
//! ## Model
//!
//! - [`ZoneIndex`](tracedb_engine::ZoneIndex) — per-zone event list and
//!   scope forest, tolerant of out-of-order batches
//! - [`SummaryIndex`](tracedb_engine::SummaryIndex) — whole-stream counts
//!   and coarse time buckets
//! - [`EventIndex`](tracedb_engine::EventIndex) — time-ordered view of one
//!   event name
//! - [`FlowTracker`](tracedb_engine::FlowTracker) — asynchronous flow
//!   correlation across zones
//! - `query` — substring / regex filters and tree expressions over the
//!   reconstructed model

#![warn(missing_docs)]

mod database;
mod deferred;
mod error;

pub mod prelude;

// Re-export main entry points
pub use database::{TraceDb, TraceDbBuilder};
pub use deferred::Deferred;
pub use error::{Error, Result};

// Re-export the layered crates for consumers that need full access
pub use tracedb_engine as engine;
pub use tracedb_query as query;
