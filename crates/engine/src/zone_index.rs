//! Per-zone event list and scope forest
//!
//! The zone index owns the time-ordered event list for one zone and the
//! scope forest reconstructed from its enter/leave events. Scopes live in
//! an arena (`Vec<Scope>` addressed by [`ScopeId`]); parents are arena
//! indices, so the parent/child relationship carries no ownership cycle and
//! renumbering is a single linear pass.
//!
//! ## Insertion protocol
//!
//! Outside a batch the index is immutable to writers. `begin_inserting`
//! records the current tail as a high-water mark; `insert_event` appends and
//! marks the index dirty when an event arrives out of time order;
//! `end_inserting` restores sort order, rewinds the forest to the deepest
//! scope entered strictly before the earliest newly-inserted time, and
//! replays events from there. The rewind window is capped
//! (`rebuild_window_cap`); beyond the cap the forest is rebuilt from
//! scratch, which is always correct.
//!
//! Unmatched leaves are recoverable: they are recorded, dropped, and
//! surfaced by the coordinator as `SOURCE_ERROR` notifications.

use crate::frame_index::FrameIndex;
use std::collections::HashMap;
use std::sync::Arc;
use tracedb_core::{
    BuiltinKind, Event, EventTypeFlags, Position, ScopeId, TimeMicros, Value, Zone, ZoneId,
};
use tracing::{debug, warn};

/// Default cap on the incremental rebuild window, in events.
pub const DEFAULT_REBUILD_WINDOW_CAP: usize = 65_536;

/// A recoverable ingest anomaly, surfaced as a `SOURCE_ERROR` notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestError {
    /// Human-readable description
    pub message: String,
    /// Optional context (zone, timestamp)
    pub detail: Option<String>,
}

impl IngestError {
    fn unmatched_leave(zone: &str, time: TimeMicros) -> Self {
        Self {
            message: "scope leave without a matching enter".to_string(),
            detail: Some(format!("zone {zone} at {time}us")),
        }
    }

    fn leave_before_enter(zone: &str, time: TimeMicros) -> Self {
        Self {
            message: "scope leave precedes its matching enter".to_string(),
            detail: Some(format!("zone {zone} at {time}us")),
        }
    }
}

/// A reconstructed scope: an enter/leave pair with derived durations.
#[derive(Debug)]
pub struct Scope {
    id: ScopeId,
    parent: Option<ScopeId>,
    depth: u32,
    enter: Arc<Event>,
    leave: Option<Arc<Event>>,
    child_count: u32,
    child_total: TimeMicros,
    data_events: Vec<Arc<Event>>,
}

impl Scope {
    /// Arena id within the owning zone index
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Parent scope id, None for a root scope
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// Nesting depth (roots are 0)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The enter event
    pub fn enter_event(&self) -> &Arc<Event> {
        &self.enter
    }

    /// The leave event, None while the scope is open
    pub fn leave_event(&self) -> Option<&Arc<Event>> {
        self.leave.as_ref()
    }

    /// Scope name: the enter event's `name` argument for the builtin enter
    /// type, otherwise the enter event's type name.
    pub fn name(&self) -> &str {
        if self.enter.event_type().builtin_kind() == Some(BuiltinKind::ScopeEnter) {
            self.enter.arg_at(0).as_str().unwrap_or("")
        } else {
            self.enter.event_type().name()
        }
    }

    /// Number of direct child scopes
    pub fn child_count(&self) -> u32 {
        self.child_count
    }

    /// `leave.time - enter.time`, None while open
    pub fn total_duration(&self) -> Option<TimeMicros> {
        self.leave.as_ref().map(|l| l.time() - self.enter.time())
    }

    /// Self time: total duration minus the total durations of direct
    /// children. None while open.
    pub fn user_duration(&self) -> Option<TimeMicros> {
        self.total_duration().map(|t| t - self.child_total)
    }

    /// True if `t` is inside `[enter.time, leave.time)`; an open scope
    /// extends to +inf.
    pub fn contains(&self, t: TimeMicros) -> bool {
        if t < self.enter.time() {
            return false;
        }
        match &self.leave {
            Some(leave) => t < leave.time(),
            None => true,
        }
    }

    /// Materialize the scope's appended data into a key/value map.
    /// Later appends override earlier keys.
    pub fn data(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        for event in &self.data_events {
            if let Some(Value::String(key)) = event.arg("name") {
                map.insert(key.clone(), event.arg("value").cloned().unwrap_or(Value::Null));
            }
        }
        map
    }
}

enum ReplayAction {
    Enter,
    Leave,
    AppendData,
    FrameStart,
    FrameEnd,
    Other,
}

fn classify(event: &Event) -> ReplayAction {
    let ty = event.event_type();
    match ty.builtin_kind() {
        Some(BuiltinKind::ScopeEnter) => ReplayAction::Enter,
        Some(BuiltinKind::ScopeLeave) => ReplayAction::Leave,
        Some(BuiltinKind::ScopeAppendData) => ReplayAction::AppendData,
        Some(BuiltinKind::FrameStart) => ReplayAction::FrameStart,
        Some(BuiltinKind::FrameEnd) => ReplayAction::FrameEnd,
        _ => {
            if ty.is_scope_enter() {
                ReplayAction::Enter
            } else if ty.is_scope_leave() {
                ReplayAction::Leave
            } else if ty.flags().contains(EventTypeFlags::APPEND_SCOPE_DATA) {
                ReplayAction::AppendData
            } else {
                ReplayAction::Other
            }
        }
    }
}

/// Event list and scope forest for one zone.
pub struct ZoneIndex {
    id: ZoneId,
    zone: Zone,
    events: Vec<Arc<Event>>,
    scopes: Vec<Scope>,
    stack: Vec<ScopeId>,
    frames: FrameIndex,
    rebuild_window_cap: usize,

    inserting: bool,
    high_water: usize,
    dirty: bool,
    batch_min_time: Option<TimeMicros>,
    errors: Vec<IngestError>,
}

impl ZoneIndex {
    /// Create an index for the given zone identity
    pub fn new(id: ZoneId, zone: Zone, rebuild_window_cap: usize) -> Self {
        Self {
            id,
            zone,
            events: Vec::new(),
            scopes: Vec::new(),
            stack: Vec::new(),
            frames: FrameIndex::new(),
            rebuild_window_cap,
            inserting: false,
            high_water: 0,
            dirty: false,
            batch_min_time: None,
            errors: Vec::new(),
        }
    }

    /// Zone slot in the database zone list
    pub fn id(&self) -> ZoneId {
        self.id
    }

    /// Zone identity
    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    /// The zone's frame index
    pub fn frame_index(&self) -> &FrameIndex {
        &self.frames
    }

    // ========== Insertion protocol ==========

    /// Enter the mutable phase and record the tail high-water mark
    pub fn begin_inserting(&mut self) {
        assert!(!self.inserting, "zone index already inserting");
        self.inserting = true;
        self.high_water = self.events.len();
        self.dirty = false;
        self.batch_min_time = None;
    }

    /// Offer one event; stored only when stamped for this zone.
    pub fn insert_event(&mut self, event: &Arc<Event>) {
        assert!(self.inserting, "zone index insert outside a batch");
        if event.zone() != Some(self.zone.name.as_str()) {
            return;
        }
        let time = event.time();
        if let Some(last) = self.events.last() {
            if time < last.time() {
                self.dirty = true;
            }
        }
        self.batch_min_time = Some(self.batch_min_time.map_or(time, |t| t.min(time)));
        self.events.push(Arc::clone(event));
    }

    /// Restore sort order, rebuild the affected slice of the scope forest,
    /// and return the recoverable errors encountered.
    pub fn end_inserting(&mut self) -> Vec<IngestError> {
        assert!(self.inserting, "zone index end_inserting outside a batch");
        self.inserting = false;

        let inserted = self.events.len() - self.high_water;
        if inserted == 0 {
            return std::mem::take(&mut self.errors);
        }

        let replay_from = if !self.dirty {
            self.high_water
        } else {
            self.events.sort_by(|a, b| Event::db_compare(a, b));
            let t_min = self.batch_min_time.expect("dirty batch with no events");
            let from = self.events.partition_point(|e| e.time() < t_min);
            if self.events.len() - from > self.rebuild_window_cap {
                warn!(
                    zone = %self.zone.name,
                    window = self.events.len() - from,
                    cap = self.rebuild_window_cap,
                    "rebuild window exceeds cap; rebuilding full scope forest"
                );
                self.scopes.clear();
                self.stack.clear();
                self.frames.clear();
                0
            } else {
                self.rewind(t_min);
                from
            }
        };

        debug!(
            zone = %self.zone.name,
            inserted,
            replay_from,
            total = self.events.len(),
            "zone batch replay"
        );
        self.replay(replay_from);
        self.recompute_derived();
        std::mem::take(&mut self.errors)
    }

    /// Rewind forest state to just before the earliest newly-inserted time:
    /// scopes entered at or after `t_min` are dropped, surviving scopes
    /// whose leave landed past `t_min` are reopened, and the open-scope
    /// stack is reconstructed from the survivors.
    fn rewind(&mut self, t_min: TimeMicros) {
        let keep = self.scopes.partition_point(|s| s.enter.time() < t_min);
        self.scopes.truncate(keep);
        self.stack.clear();
        for scope in &mut self.scopes {
            if scope.leave.as_ref().is_some_and(|l| l.time() >= t_min) {
                scope.leave = None;
            }
            scope.data_events.retain(|d| d.time() < t_min);
        }
        // Surviving open scopes form the enclosing chain at t_min, in
        // enter-time order.
        for scope in &self.scopes {
            if scope.leave.is_none() {
                self.stack.push(scope.id);
            }
        }
        self.frames.rewind(t_min);
    }

    fn replay(&mut self, from: usize) {
        for i in from..self.events.len() {
            let event = Arc::clone(&self.events[i]);
            match classify(&event) {
                ReplayAction::Enter => {
                    let id = ScopeId(self.scopes.len() as u32);
                    self.scopes.push(Scope {
                        id,
                        parent: self.stack.last().copied(),
                        depth: self.stack.len() as u32,
                        enter: event,
                        leave: None,
                        child_count: 0,
                        child_total: 0,
                        data_events: Vec::new(),
                    });
                    self.stack.push(id);
                }
                ReplayAction::Leave => match self.stack.last().copied() {
                    None => {
                        self.errors
                            .push(IngestError::unmatched_leave(&self.zone.name, event.time()));
                    }
                    Some(top) => {
                        let scope = &mut self.scopes[top.index()];
                        if event.time() < scope.enter.time() {
                            self.errors.push(IngestError::leave_before_enter(
                                &self.zone.name,
                                event.time(),
                            ));
                        } else {
                            scope.leave = Some(event);
                            self.stack.pop();
                        }
                    }
                },
                ReplayAction::AppendData => {
                    if let Some(&top) = self.stack.last() {
                        self.scopes[top.index()].data_events.push(event);
                    }
                }
                ReplayAction::FrameStart => self.frames.on_frame_start(&event),
                ReplayAction::FrameEnd => self.frames.on_frame_end(&event),
                ReplayAction::Other => {}
            }
        }
    }

    /// Recompute child counts and aggregate child durations in one linear
    /// pass over the arena.
    fn recompute_derived(&mut self) {
        for scope in &mut self.scopes {
            scope.child_count = 0;
            scope.child_total = 0;
        }
        for i in 0..self.scopes.len() {
            let Some(parent) = self.scopes[i].parent else {
                continue;
            };
            let total = self.scopes[i].total_duration();
            let parent = &mut self.scopes[parent.index()];
            parent.child_count += 1;
            if let Some(total) = total {
                parent.child_total += total;
            }
        }
    }

    /// Assign positions to all events in time order starting at `start`;
    /// returns the next free position. Called by the coordinator in
    /// deterministic zone order at every batch end.
    pub fn renumber(&mut self, start: Position) -> Position {
        assert!(!self.inserting, "renumber during insertion");
        let mut position = start;
        for event in &self.events {
            event.set_position(position);
            position += 1;
        }
        position
    }

    // ========== Queries ==========

    /// Number of events in this zone
    pub fn count(&self) -> usize {
        self.events.len()
    }

    /// All events in `(time, position)` order
    pub fn events(&self) -> &[Arc<Event>] {
        &self.events
    }

    /// Visit events in the half-open time range `[start, end)` in order
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

    /// Look up a scope by arena id
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// All scopes in enter-time order
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Root scopes (no parent) in enter-time order
    pub fn root_scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter().filter(|s| s.parent.is_none())
    }

    /// The scope opened by the given enter event, if any
    pub fn scope_with_enter(&self, event: &Arc<Event>) -> Option<&Scope> {
        let mut at = self.scopes.partition_point(|s| s.enter.time() < event.time());
        while let Some(scope) = self.scopes.get(at) {
            if scope.enter.time() != event.time() {
                return None;
            }
            if Arc::ptr_eq(&scope.enter, event) {
                return Some(scope);
            }
            at += 1;
        }
        None
    }

    /// The innermost scope whose time range contains `t`
    pub fn scope_at(&self, t: TimeMicros) -> Option<&Scope> {
        let idx = self.scopes.partition_point(|s| s.enter.time() <= t);
        let mut scope = &self.scopes[idx.checked_sub(1)?];
        loop {
            if scope.contains(t) {
                return Some(scope);
            }
            scope = &self.scopes[scope.parent?.index()];
        }
    }
}
