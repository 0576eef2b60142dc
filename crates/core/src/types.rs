//! Core identifier and time types
//!
//! This module defines the small copy types used throughout the system:
//! - [`TimeMicros`]: event timestamps, microseconds relative to a timebase
//! - [`Position`]: dense global event ordinal, assigned at batch end
//! - [`ScopeId`], [`ZoneId`], [`EventIndexId`]: arena / slot indices
//! - [`FlowId`]: session-unique flow correlation identifier

use serde::{Deserialize, Serialize};

/// Event timestamp in microseconds, relative to the owning source's timebase.
///
/// Times are session-relative; converting to wall-clock time requires the
/// source timebase recorded at `source_added`.
pub type TimeMicros = i64;

/// Dense global event ordinal.
///
/// Position 0 is reserved for the database root node; event positions start
/// at 1 and are reassigned by a full renumber pass at every batch end.
/// Within a snapshot, `(time, position)` is a total order over all events.
pub type Position = u32;

/// Reserved position of the database root node.
pub const ROOT_POSITION: Position = 0;

/// Index of a scope within its zone's scope arena.
///
/// Scopes reference their parent by `ScopeId` rather than an owning pointer,
/// which keeps the parent/child relationship cycle-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// Arena slot for this id
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Index of a zone within the database's zone list.
///
/// Zone ids are assigned in creation order and never reused; the zone list
/// order is the deterministic renumbering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub u32);

impl ZoneId {
    /// Slot in the database zone list
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "zone#{}", self.0)
    }
}

/// Slot of a per-name event index within the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventIndexId(pub u32);

impl EventIndexId {
    /// Slot in the database event-index list
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Session-unique flow correlation identifier.
///
/// Flow ids are assigned by the instrumented source; id 0 is the sentinel
/// for "no flow" / "no parent" on the wire and never names a real flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId(pub u64);

impl FlowId {
    /// Wire sentinel meaning "no flow".
    pub const NONE: FlowId = FlowId(0);

    /// True if this is the "no flow" sentinel
    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "flow#{}", self.0)
    }
}
