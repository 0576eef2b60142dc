//! The database engine and ingest coordinator
//!
//! [`Database`] is the single writer. A source adapter drives it through
//! the listener contract — `source_added`, `begin_event_batch`, N times
//! `trace_event`, `end_event_batch` — and all index mutation happens inside
//! that bracket. Reads occur between batches; there is no locking because
//! mutation is `&mut self` and queries are `&self`.
//!
//! Inside a batch each event fans out to the fixed target list
//! `[summary, zones…, event-name indices…]`. The order is load-bearing: the
//! summary sees every event, zone indices observe `wtf.zone#create` before
//! any event of the new zone, and per-name indices see everything last. A
//! zone created mid-batch is appended to the end of the zones sub-range,
//! never reordered.
//!
//! Structural contract violations (nested batches, inserts outside a batch)
//! are programmer errors and fail fast; data errors never abort a batch.

use crate::event_index::EventIndex;
use crate::flow::FlowTracker;
use crate::summary_index::{SummaryIndex, DEFAULT_GRANULARITY_SHIFT};
use crate::zone_index::{IngestError, ZoneIndex, DEFAULT_REBUILD_WINDOW_CAP};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracedb_core::{
    BuiltinKind, Event, EventIndexId, EventTypeRegistry, Position, TimeMicros, Value, Zone, ZoneId,
};
use tracing::debug;

/// Name of the zone used for events ingested before any `wtf.zone#create`.
pub const DEFAULT_ZONE_NAME: &str = "Default";

/// Engine tuning knobs, set through the facade builder.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Summary bucket width: `1 << summary_granularity_shift` microseconds
    pub summary_granularity_shift: u32,
    /// Cap on the zone-index incremental rebuild window, in events
    pub rebuild_window_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            summary_granularity_shift: DEFAULT_GRANULARITY_SHIFT,
            rebuild_window_cap: DEFAULT_REBUILD_WINDOW_CAP,
        }
    }
}

/// A registered event source.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    /// Wall-clock anchor for this source's event times, microseconds
    pub timebase: TimeMicros,
    /// Opaque adapter-provided context
    pub context: Value,
}

/// Change notifications delivered to registered observers.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseEvent {
    /// A source was added
    SourcesChanged,
    /// A source or ingest error occurred; ingest state is undisturbed
    SourceError {
        /// Human-readable description
        message: String,
        /// Optional context
        detail: Option<String>,
    },
    /// New zones appeared in the last batch
    ZonesAdded(Vec<ZoneId>),
    /// Indexed data changed; snapshots taken before this are stale
    Invalidated,
}

/// Observer callback. Observers must not call back into the database.
pub type Observer = Box<dyn Fn(&DatabaseEvent)>;

struct BatchState {
    inserted: u64,
    new_zones: Vec<ZoneId>,
}

/// The in-memory trace database engine.
pub struct Database {
    config: EngineConfig,
    registry: EventTypeRegistry,
    sources: Vec<SourceInfo>,
    summary: SummaryIndex,
    zones: Vec<ZoneIndex>,
    zone_lookup: FxHashMap<String, ZoneId>,
    event_indices: Vec<EventIndex>,
    event_index_lookup: FxHashMap<String, EventIndexId>,
    flows: FlowTracker,
    observers: Vec<Observer>,
    total_event_count: u64,
    batch: Option<BatchState>,
}

impl Database {
    /// Create an empty database with default tuning
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an empty database with explicit tuning
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            registry: EventTypeRegistry::new(),
            sources: Vec::new(),
            summary: SummaryIndex::new(config.summary_granularity_shift),
            zones: Vec::new(),
            zone_lookup: FxHashMap::default(),
            event_indices: Vec::new(),
            event_index_lookup: FxHashMap::default(),
            flows: FlowTracker::new(),
            observers: Vec::new(),
            total_event_count: 0,
            batch: None,
        }
    }

    // ========== Observers ==========

    /// Register a change observer
    pub fn add_observer(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    fn emit(&self, event: DatabaseEvent) {
        for observer in &self.observers {
            observer(&event);
        }
    }

    // ========== Registry ==========

    /// The event type registry
    pub fn registry(&self) -> &EventTypeRegistry {
        &self.registry
    }

    /// Mutable registry access for the source adapter's declarations
    pub fn registry_mut(&mut self) -> &mut EventTypeRegistry {
        &mut self.registry
    }

    // ========== Listener contract (inbound) ==========

    /// Register a source and its timebase
    pub fn source_added(&mut self, timebase: TimeMicros, context: Value) {
        self.sources.push(SourceInfo { timebase, context });
        self.emit(DatabaseEvent::SourcesChanged);
        self.emit(DatabaseEvent::Invalidated);
    }

    /// Report a source-side error without disturbing ingest state
    pub fn source_error(&mut self, message: impl Into<String>, detail: Option<String>) {
        self.emit(DatabaseEvent::SourceError {
            message: message.into(),
            detail,
        });
    }

    /// Open an event batch. Every index enters its mutable phase.
    pub fn begin_event_batch(&mut self, _context: Value) {
        assert!(self.batch.is_none(), "event batch already open");
        self.summary.begin_inserting();
        for zone in &mut self.zones {
            zone.begin_inserting();
        }
        for index in &mut self.event_indices {
            index.begin_inserting();
        }
        self.batch = Some(BatchState {
            inserted: 0,
            new_zones: Vec::new(),
        });
        debug!(zones = self.zones.len(), "event batch opened");
    }

    /// Ingest one event: resolve its zone, count it, fan it out to the
    /// target list in order, and route flow events to the tracker.
    pub fn trace_event(&mut self, mut event: Event) {
        assert!(self.batch.is_some(), "trace_event outside an event batch");

        if event.event_type().builtin_kind() == Some(BuiltinKind::ZoneCreate) {
            let name = event.arg_at(0).as_str().unwrap_or("").to_string();
            if name.is_empty() {
                self.source_error("zone create without a name", None);
                return;
            }
            let zone_type = event.arg_at(1).as_str().unwrap_or("").to_string();
            let location = event.arg_at(2).as_str().unwrap_or("").to_string();
            self.ensure_zone(&name, &zone_type, &location);
            event.set_zone(&name);
        } else if let Some(stamped) = event.zone() {
            // Events may reference a zone the stream never explicitly
            // created; materialize it so positions stay dense.
            let name = stamped.to_string();
            self.ensure_zone(&name, "", "");
        } else {
            let current = self.current_zone_name();
            event.set_zone(&current);
        }

        let ty = event.event_type();
        if !ty.is_internal() && !ty.is_scope_leave() {
            self.total_event_count += 1;
        }

        let event = Arc::new(event);
        self.batch
            .as_mut()
            .expect("trace_event outside an event batch")
            .inserted += 1;

        // Fixed fan-out order: summary, zones, per-name indices.
        self.summary.insert_event(&event);
        for zone in &mut self.zones {
            zone.insert_event(&event);
        }
        for index in &mut self.event_indices {
            index.insert_event(&event);
        }

        if FlowTracker::is_flow_event(&event) {
            self.flows.on_event(&event);
        }
    }

    /// Close the batch: unwind the target list in reverse order, renumber
    /// all events, and notify observers.
    pub fn end_event_batch(&mut self) {
        let batch = self.batch.take().expect("end_event_batch without a batch");

        for index in self.event_indices.iter_mut().rev() {
            index.end_inserting();
        }
        let mut errors: Vec<IngestError> = Vec::new();
        for zone in self.zones.iter_mut().rev() {
            errors.extend(zone.end_inserting());
        }
        self.summary.end_inserting();

        self.renumber();

        for error in errors {
            self.emit(DatabaseEvent::SourceError {
                message: error.message,
                detail: error.detail,
            });
        }
        if !batch.new_zones.is_empty() {
            self.emit(DatabaseEvent::ZonesAdded(batch.new_zones));
        }
        if batch.inserted > 0 {
            self.emit(DatabaseEvent::Invalidated);
        }
        debug!(inserted = batch.inserted, "event batch closed");
    }

    /// Assign dense positions `{1..N}` across all zones in zone order
    fn renumber(&mut self) {
        let mut position: Position = 1;
        for zone in &mut self.zones {
            position = zone.renumber(position);
        }
    }

    fn current_zone_name(&mut self) -> String {
        match self.zones.last() {
            Some(zone) => zone.zone().name.clone(),
            None => {
                self.ensure_zone(DEFAULT_ZONE_NAME, "default", "");
                DEFAULT_ZONE_NAME.to_string()
            }
        }
    }

    /// Create a zone index if the name is unseen; duplicates are ignored.
    /// Mid-batch creations join the in-flight target list at the end of the
    /// zones sub-range.
    fn ensure_zone(&mut self, name: &str, zone_type: &str, location: &str) -> ZoneId {
        if let Some(&id) = self.zone_lookup.get(name) {
            return id;
        }
        let id = ZoneId(self.zones.len() as u32);
        let mut zone = ZoneIndex::new(
            id,
            Zone::new(name, zone_type, location),
            self.config.rebuild_window_cap,
        );
        if let Some(batch) = self.batch.as_mut() {
            zone.begin_inserting();
            batch.new_zones.push(id);
        }
        self.zones.push(zone);
        self.zone_lookup.insert(name.to_string(), id);
        debug!(zone = name, "zone created");
        id
    }

    // ========== Accessors (outbound) ==========

    /// Registered sources in registration order
    pub fn sources(&self) -> &[SourceInfo] {
        &self.sources
    }

    /// Common timebase: the minimum across all source timebases
    pub fn timebase(&self) -> Option<TimeMicros> {
        self.sources.iter().map(|s| s.timebase).min()
    }

    /// Number of ingested events, excluding internal events and scope
    /// leaves
    pub fn total_event_count(&self) -> u64 {
        self.total_event_count
    }

    /// Time of the earliest ingested event
    pub fn first_event_time(&self) -> Option<TimeMicros> {
        self.summary.first_time()
    }

    /// Time of the latest ingested event
    pub fn last_event_time(&self) -> Option<TimeMicros> {
        self.summary.last_time()
    }

    /// The whole-stream summary index
    pub fn summary_index(&self) -> &SummaryIndex {
        &self.summary
    }

    /// All zone indices in creation order
    pub fn zone_indices(&self) -> &[ZoneIndex] {
        &self.zones
    }

    /// Zone index by id
    pub fn zone_index(&self, id: ZoneId) -> &ZoneIndex {
        &self.zones[id.index()]
    }

    /// Zone index by zone name
    pub fn zone_by_name(&self, name: &str) -> Option<&ZoneIndex> {
        self.zone_lookup.get(name).map(|&id| self.zone_index(id))
    }

    /// The first zone's frame index, if any zone exists
    pub fn first_frame_index(&self) -> Option<&crate::frame_index::FrameIndex> {
        self.zones.first().map(|z| z.frame_index())
    }

    /// The flow tracker
    pub fn flow_tracker(&self) -> &FlowTracker {
        &self.flows
    }

    /// True while an event batch is open
    pub fn is_inserting(&self) -> bool {
        self.batch.is_some()
    }

    // ========== Per-name event indices ==========

    /// Create (or return) the per-name index for `name`, back-filling it
    /// from the existing zone indices. Idempotent.
    pub fn create_event_index(&mut self, name: &str) -> EventIndexId {
        if let Some(&id) = self.event_index_lookup.get(name) {
            return id;
        }
        let id = EventIndexId(self.event_indices.len() as u32);
        let mut index = EventIndex::new(name);

        let mut existing = Vec::new();
        for zone in &self.zones {
            for event in zone.events() {
                if event.event_type().name() == name {
                    existing.push(Arc::clone(event));
                }
            }
        }
        index.backfill(existing);

        if self.batch.is_some() {
            index.begin_inserting();
        }
        self.event_indices.push(index);
        self.event_index_lookup.insert(name.to_string(), id);
        id
    }

    /// Look up a per-name index by name
    pub fn get_event_index(&self, name: &str) -> Option<&EventIndex> {
        self.event_index_lookup
            .get(name)
            .map(|&id| self.event_index(id))
    }

    /// Per-name index by id
    pub fn event_index(&self, id: EventIndexId) -> &EventIndex {
        &self.event_indices[id.index()]
    }

    /// All per-name indices in creation order
    pub fn event_indices(&self) -> &[EventIndex] {
        &self.event_indices
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
