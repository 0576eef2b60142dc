//! The canonical ingested event record
//!
//! An [`Event`] is immutable after ingest except for its `position`, the
//! dense global ordinal reassigned by the coordinator's renumber pass at
//! every batch end. Indices and query results share events through
//! `Arc<Event>` handles; the position therefore lives in an atomic cell so
//! renumbering never needs exclusive access to the record.

use crate::event_type::EventType;
use crate::types::{Position, TimeMicros};
use crate::value::Value;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::Arc;

/// A single timestamped record of an instrumented action.
///
/// Arguments are schema-aligned: `args[i]` is the value of
/// `event_type().args()[i]`. Missing trailing arguments read as
/// [`Value::Null`].
#[derive(Debug)]
pub struct Event {
    time: TimeMicros,
    event_type: Arc<EventType>,
    args: Vec<Value>,
    zone: Option<Box<str>>,
    position: AtomicU32,
}

impl Event {
    /// Create an event bound for ingest.
    ///
    /// `position` starts at 0 and is assigned by the coordinator at batch
    /// end; `zone` is the optional zone name the source attributes the
    /// event to (zone-less events are stamped by the coordinator).
    pub fn new(event_type: Arc<EventType>, time: TimeMicros, args: Vec<Value>) -> Self {
        Self {
            time,
            event_type,
            args,
            zone: None,
            position: AtomicU32::new(0),
        }
    }

    /// Event timestamp, microseconds relative to the source timebase
    #[inline]
    pub fn time(&self) -> TimeMicros {
        self.time
    }

    /// Interned schema handle
    #[inline]
    pub fn event_type(&self) -> &Arc<EventType> {
        &self.event_type
    }

    /// Schema-aligned argument values
    #[inline]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Argument value at a schema position (`Null` when omitted)
    pub fn arg_at(&self, index: usize) -> &Value {
        self.args.get(index).unwrap_or(&Value::Null)
    }

    /// Argument value by schema name
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.event_type.arg_index(name).map(|i| self.arg_at(i))
    }

    /// Zone name the event belongs to (stamped by the coordinator)
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    /// Stamp the owning zone. Called by the coordinator before the event is
    /// shared; events already fanned out are never restamped.
    pub fn set_zone(&mut self, zone: &str) {
        self.zone = Some(zone.into());
    }

    /// Global ordinal within the current snapshot (0 until first renumber)
    #[inline]
    pub fn position(&self) -> Position {
        self.position.load(AtomicOrdering::Relaxed)
    }

    /// Assign the global ordinal. Called only by the coordinator's renumber
    /// pass between batches.
    #[inline]
    pub fn set_position(&self, position: Position) {
        self.position.store(position, AtomicOrdering::Relaxed);
    }

    /// The database event order: `(time, position)` ascending.
    ///
    /// This is the comparator behind every index and every query result
    /// ordering guarantee.
    pub fn db_compare(a: &Event, b: &Event) -> Ordering {
        a.time
            .cmp(&b.time)
            .then_with(|| a.position().cmp(&b.position()))
    }

    /// True if the event's type carries the INTERNAL flag
    #[inline]
    pub fn is_internal(&self) -> bool {
        self.event_type.is_internal()
    }
}
