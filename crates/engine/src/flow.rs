//! Asynchronous flow correlation
//!
//! Flows stitch asynchronous work together across zones: a branch event
//! opens a flow under a session-unique id, extend events mark progress,
//! and a terminate event closes it. Data-append events queue on the flow
//! and are materialized on demand by [`Flow::data`].
//!
//! The tracker holds flows for the whole session; ids are never reused and
//! flows are never collected.

use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracedb_core::{BuiltinKind, Event, EventTypeFlags, FlowId, Value};
use tracing::warn;

/// An identifier-linked chain of events correlating asynchronous work.
#[derive(Debug)]
pub struct Flow {
    id: FlowId,
    parent: Option<FlowId>,
    branch: Option<Arc<Event>>,
    extends: Vec<Arc<Event>>,
    terminate: Option<Arc<Event>>,
    data_events: Vec<Arc<Event>>,
}

impl Flow {
    fn new(id: FlowId) -> Self {
        Self {
            id,
            parent: None,
            branch: None,
            extends: Vec::new(),
            terminate: None,
            data_events: Vec::new(),
        }
    }

    /// Session-unique flow id
    pub fn id(&self) -> FlowId {
        self.id
    }

    /// Parent flow id recorded at branch time. The parent flow is owned by
    /// the tracker; this is a back-reference only.
    pub fn parent(&self) -> Option<FlowId> {
        self.parent
    }

    /// The branch event that opened the flow
    pub fn branch_event(&self) -> Option<&Arc<Event>> {
        self.branch.as_ref()
    }

    /// Extend events in arrival order
    pub fn extend_events(&self) -> &[Arc<Event>] {
        &self.extends
    }

    /// The terminate event, if the flow has closed
    pub fn terminate_event(&self) -> Option<&Arc<Event>> {
        self.terminate.as_ref()
    }

    /// True once a terminate event has been recorded
    pub fn is_closed(&self) -> bool {
        self.terminate.is_some()
    }

    /// Materialize appended data as a key/value map: the left-fold of the
    /// queued data events, later keys overriding earlier ones. Builtin
    /// appenders contribute their single `{name: value}` pair; user-defined
    /// appenders contribute every argument except the flow id.
    pub fn data(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        for event in &self.data_events {
            if event.event_type().builtin_kind() == Some(BuiltinKind::FlowAppendData) {
                if let Some(Value::String(key)) = event.arg("name") {
                    map.insert(key.clone(), event.arg("value").cloned().unwrap_or(Value::Null));
                }
            } else {
                for (slot, arg) in event.event_type().args().iter().enumerate() {
                    if arg.name == "id" {
                        continue;
                    }
                    map.insert(arg.name.clone(), event.arg_at(slot).clone());
                }
            }
        }
        map
    }
}

/// Session-wide map of flow id to flow.
#[derive(Default)]
pub struct FlowTracker {
    flows: FxHashMap<FlowId, Flow>,
}

impl FlowTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked flows
    pub fn count(&self) -> usize {
        self.flows.len()
    }

    /// Look up a flow by id
    pub fn flow(&self, id: FlowId) -> Option<&Flow> {
        self.flows.get(&id)
    }

    /// Iterate all flows (unordered)
    pub fn flows(&self) -> impl Iterator<Item = &Flow> {
        self.flows.values()
    }

    fn flow_id_of(event: &Event) -> Option<FlowId> {
        let id = FlowId(event.arg("id")?.as_int()? as u64);
        (!id.is_none()).then_some(id)
    }

    fn entry(&mut self, id: FlowId) -> &mut Flow {
        self.flows.entry(id).or_insert_with(|| Flow::new(id))
    }

    /// Route one flow-classified event. Called by the coordinator for
    /// events whose type is a flow builtin or carries the
    /// `APPEND_FLOW_DATA` flag.
    pub fn on_event(&mut self, event: &Arc<Event>) {
        let Some(id) = Self::flow_id_of(event) else {
            warn!("flow event without a usable id argument; dropped");
            return;
        };

        match event.event_type().builtin_kind() {
            Some(BuiltinKind::FlowBranch) => {
                let parent = event
                    .arg("parentId")
                    .and_then(Value::as_int)
                    .map(|p| FlowId(p as u64))
                    .filter(|p| !p.is_none());
                let flow = self.entry(id);
                if flow.branch.is_some() {
                    warn!(flow = %id, "duplicate flow branch; keeping the first");
                    return;
                }
                flow.parent = parent;
                flow.branch = Some(Arc::clone(event));
            }
            Some(BuiltinKind::FlowExtend) => {
                let flow = self.entry(id);
                if flow.is_closed() {
                    warn!(flow = %id, "extend on a closed flow");
                }
                flow.extends.push(Arc::clone(event));
            }
            Some(BuiltinKind::FlowTerminate) => {
                let flow = self.entry(id);
                if flow.is_closed() {
                    warn!(flow = %id, "terminate on a closed flow; keeping the first");
                    return;
                }
                flow.terminate = Some(Arc::clone(event));
            }
            _ => {
                // Builtin or user-defined data appender
                let flow = self.entry(id);
                if flow.is_closed() {
                    warn!(flow = %id, "data appended to a closed flow");
                }
                flow.data_events.push(Arc::clone(event));
            }
        }
    }

    /// True if the event's type participates in flow tracking
    pub fn is_flow_event(event: &Event) -> bool {
        matches!(
            event.event_type().builtin_kind(),
            Some(BuiltinKind::FlowBranch)
                | Some(BuiltinKind::FlowExtend)
                | Some(BuiltinKind::FlowTerminate)
                | Some(BuiltinKind::FlowAppendData)
        ) || event
            .event_type()
            .flags()
            .contains(EventTypeFlags::APPEND_FLOW_DATA)
    }
}
