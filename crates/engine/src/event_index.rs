//! Per-name secondary event index
//!
//! A time-ordered list of the events whose type name matches exactly one
//! string. Indices participate in the batch protocol like every other
//! target: appends inside a batch, a stable `(time, position)` sort at
//! `end_inserting` when an out-of-order arrival marked the index dirty.
//!
//! An index created after ingest has begun is back-filled from the existing
//! zone indices (see `Database::create_event_index`), so `count` reflects
//! the full stream from the moment of creation.

use std::sync::Arc;
use tracedb_core::{Event, TimeMicros};

/// Time-ordered index of events of a single type name.
pub struct EventIndex {
    name: String,
    events: Vec<Arc<Event>>,
    inserting: bool,
    dirty: bool,
}

impl EventIndex {
    /// Create an empty index for the given fully-qualified type name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Vec::new(),
            inserting: false,
            dirty: false,
        }
    }

    /// The type name this index matches
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enter the mutable phase for a batch
    pub fn begin_inserting(&mut self) {
        assert!(!self.inserting, "event index already inserting");
        self.inserting = true;
        self.dirty = false;
    }

    /// Offer one event; stored only when the type name matches.
    pub fn insert_event(&mut self, event: &Arc<Event>) {
        assert!(self.inserting, "event index insert outside a batch");
        if event.event_type().name() != self.name {
            return;
        }
        if let Some(last) = self.events.last() {
            if event.time() < last.time() {
                self.dirty = true;
            }
        }
        self.events.push(Arc::clone(event));
    }

    /// Restore time order if the batch arrived out of order
    pub fn end_inserting(&mut self) {
        assert!(self.inserting, "event index end_inserting outside a batch");
        self.inserting = false;
        if self.dirty {
            self.events.sort_by(|a, b| Event::db_compare(a, b));
            self.dirty = false;
        }
    }

    /// Seed the index from already-ingested events. The input must not
    /// contain duplicates; it is sorted into database order here.
    pub(crate) fn backfill(&mut self, mut events: Vec<Arc<Event>>) {
        debug_assert!(self.events.is_empty());
        events.sort_by(|a, b| Event::db_compare(a, b));
        self.events = events;
    }

    /// Number of indexed events
    pub fn count(&self) -> usize {
        self.events.len()
    }

    /// All indexed events in `(time, position)` order
    pub fn events(&self) -> &[Arc<Event>] {
        &self.events
    }

    /// Visit events in the half-open time range `[start, end)` in order.
    /// The lower bound is located by binary search.
    pub fn for_each<F>(&self, start: TimeMicros, end: TimeMicros, mut f: F)
    where
        F: FnMut(&Arc<Event>),
    {
        let lower = self.events.partition_point(|e| e.time() < start);
        for event in &self.events[lower..] {
            if event.time() >= end {
                break;
            }
            f(event);
        }
    }
}
