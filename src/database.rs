//! Main database entry point.
//!
//! This module provides the [`TraceDb`] struct, the primary entry point for
//! ingesting and querying trace sessions.

use crate::deferred::Deferred;
use crate::error::Result;
use tracedb_core::{Event, EventIndexId, EventTypeRegistry, TimeMicros, Value};
use tracedb_engine::{
    Database, EngineConfig, EventIndex, FlowTracker, FrameIndex, Observer, SourceInfo,
    SummaryIndex, ZoneIndex,
};
use tracedb_query::QueryResult;

/// The trace database.
///
/// An in-memory, append-oriented store for timestamped tracing events. A
/// source adapter drives ingest through the listener contract
/// (`source_added`, `begin_event_batch` / `trace_event` /
/// `end_event_batch`); consumers read the reconstructed model and run
/// queries between batches.
///
/// # Example
///
/// ```ignore
/// use tracedb::prelude::*;
///
/// let mut db = TraceDb::new();
/// db.source_added(0, Value::Null);
///
/// db.begin_event_batch(Value::Null);
/// for event in parsed_events {
///     db.trace_event(event);
/// }
/// db.end_event_batch();
///
/// let result = db.query("renderFrame")?;
/// ```
///
/// All mutation is `&mut self` and all reads are `&self`: the database is
/// single-writer by construction and needs no locks. Wrap it in your own
/// synchronization if ingest and queries live on different tasks.
pub struct TraceDb {
    inner: Database,
}

impl TraceDb {
    /// Create an empty database with default tuning
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for database configuration
    pub fn builder() -> TraceDbBuilder {
        TraceDbBuilder::new()
    }

    // ========== Event type registry ==========

    /// The event type registry
    pub fn registry(&self) -> &EventTypeRegistry {
        self.inner.registry()
    }

    /// Mutable registry access, used by source adapters to declare user
    /// event types before referencing them
    pub fn registry_mut(&mut self) -> &mut EventTypeRegistry {
        self.inner.registry_mut()
    }

    // ========== Listener contract (inbound) ==========

    /// Register a source and its timebase; emits `SOURCES_CHANGED` and
    /// `INVALIDATED`
    pub fn source_added(&mut self, timebase: TimeMicros, context: Value) {
        self.inner.source_added(timebase, context);
    }

    /// Report a source-side error; emits `SOURCE_ERROR` without disturbing
    /// ingest state
    pub fn source_error(&mut self, message: impl Into<String>, detail: Option<String>) {
        self.inner.source_error(message, detail);
    }

    /// Open an event batch. Panics if a batch is already open.
    pub fn begin_event_batch(&mut self, context: Value) {
        self.inner.begin_event_batch(context);
    }

    /// Ingest one event. Panics outside a batch.
    pub fn trace_event(&mut self, event: Event) {
        self.inner.trace_event(event);
    }

    /// Close the batch: indices leave their mutable phase, positions are
    /// renumbered, and `ZONES_ADDED` / `INVALIDATED` fire as appropriate.
    pub fn end_event_batch(&mut self) {
        self.inner.end_event_batch();
    }

    /// Register a change observer
    pub fn add_observer(&mut self, observer: Observer) {
        self.inner.add_observer(observer);
    }

    // ========== Accessors (outbound) ==========

    /// Registered sources in registration order
    pub fn sources(&self) -> &[SourceInfo] {
        self.inner.sources()
    }

    /// Number of ingested events, excluding internal events and scope
    /// leaves
    pub fn total_event_count(&self) -> u64 {
        self.inner.total_event_count()
    }

    /// Common timebase: the minimum across all source timebases
    pub fn timebase(&self) -> Option<TimeMicros> {
        self.inner.timebase()
    }

    /// Time of the earliest ingested event
    pub fn first_event_time(&self) -> Option<TimeMicros> {
        self.inner.first_event_time()
    }

    /// Time of the latest ingested event
    pub fn last_event_time(&self) -> Option<TimeMicros> {
        self.inner.last_event_time()
    }

    /// The whole-stream summary index
    pub fn summary_index(&self) -> &SummaryIndex {
        self.inner.summary_index()
    }

    /// All zone indices in creation order
    pub fn zone_indices(&self) -> &[ZoneIndex] {
        self.inner.zone_indices()
    }

    /// Zone index by zone name
    pub fn zone_by_name(&self, name: &str) -> Option<&ZoneIndex> {
        self.inner.zone_by_name(name)
    }

    /// The first zone's frame index, if any zone exists
    pub fn first_frame_index(&self) -> Option<&FrameIndex> {
        self.inner.first_frame_index()
    }

    /// The flow tracker
    pub fn flow_tracker(&self) -> &FlowTracker {
        self.inner.flow_tracker()
    }

    // ========== Per-name event indices ==========

    /// Create (or return) the per-name index for `name`. Idempotent; the
    /// index is back-filled from already-ingested events.
    ///
    /// The result is deferred because a virtualized backing store may need
    /// to load before the index is usable; the in-memory implementation
    /// completes synchronously.
    pub fn create_event_index(&mut self, name: &str) -> Deferred<EventIndexId> {
        Deferred::ready(self.inner.create_event_index(name))
    }

    /// Look up a per-name index by name
    pub fn get_event_index(&self, name: &str) -> Option<&EventIndex> {
        self.inner.get_event_index(name)
    }

    /// Per-name index by id (from a resolved [`Deferred`])
    pub fn event_index(&self, id: EventIndexId) -> &EventIndex {
        self.inner.event_index(id)
    }

    // ========== Queries ==========

    /// Classify and run a query string.
    ///
    /// Returns an error for an unparsable filter regex or tree expression.
    pub fn query(&self, expression: &str) -> Result<QueryResult> {
        Ok(tracedb_query::query(&self.inner, expression)?)
    }

    /// The underlying engine database, for advanced read-only consumers
    pub fn engine(&self) -> &Database {
        &self.inner
    }
}

impl Default for TraceDb {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for database configuration.
///
/// # Example
///
/// ```ignore
/// let db = TraceDb::builder()
///     .summary_granularity_shift(16)   // ~65ms summary buckets
///     .rebuild_window_cap(10_000)
///     .build();
/// ```
pub struct TraceDbBuilder {
    config: EngineConfig,
}

impl TraceDbBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Summary bucket width: `1 << shift` microseconds
    pub fn summary_granularity_shift(mut self, shift: u32) -> Self {
        self.config.summary_granularity_shift = shift;
        self
    }

    /// Cap on the zone-index incremental rebuild window, in events.
    /// Out-of-order batches that would rewind further trigger a full
    /// forest rebuild instead.
    pub fn rebuild_window_cap(mut self, cap: usize) -> Self {
        self.config.rebuild_window_cap = cap;
        self
    }

    /// Build the database
    pub fn build(self) -> TraceDb {
        TraceDb {
            inner: Database::with_config(self.config),
        }
    }
}

impl Default for TraceDbBuilder {
    fn default() -> Self {
        Self::new()
    }
}
