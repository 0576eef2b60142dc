//! Navigable node view of the database
//!
//! The database, each zone index, each scope, and each event serve as nodes
//! of one virtual tree for the tree-expression query path: the database is
//! the root (position 0), zone indices are its children, scopes hang under
//! their zone or parent scope, and events are leaves attached to the
//! innermost scope containing their timestamp.
//!
//! [`NodeRef`] is the capability: a copyable handle with a tagged kind,
//! dispatching every node operation without exposing the concrete type to
//! the evaluator. Internal events are structural and do not appear as
//! children.

use crate::database::Database;
use crate::zone_index::{Scope, ZoneIndex};
use std::sync::Arc;
use tracedb_core::{Event, Position, ScopeId, Value, ZoneId, ROOT_POSITION};

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// The database root
    Database,
    /// A zone index
    Zone,
    /// A reconstructed scope
    Scope,
    /// A leaf event
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Database,
    Zone(ZoneId),
    Scope(ZoneId, ScopeId),
    Event(ZoneId, u32),
}

/// A borrowed handle to one node of the virtual tree.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    db: &'a Database,
    kind: NodeKind,
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef").field("kind", &self.kind).finish()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.db, other.db) && self.kind == other.kind
    }
}

impl<'a> NodeRef<'a> {
    /// The database root node
    pub fn root(db: &'a Database) -> Self {
        Self {
            db,
            kind: NodeKind::Database,
        }
    }

    /// Node for a zone index
    pub fn zone(db: &'a Database, id: ZoneId) -> Self {
        Self {
            db,
            kind: NodeKind::Zone(id),
        }
    }

    /// Node for a scope
    pub fn scope(db: &'a Database, zone: ZoneId, id: ScopeId) -> Self {
        Self {
            db,
            kind: NodeKind::Scope(zone, id),
        }
    }

    /// Node for an event (by slot in its zone's event list)
    pub fn event(db: &'a Database, zone: ZoneId, slot: u32) -> Self {
        Self {
            db,
            kind: NodeKind::Event(zone, slot),
        }
    }

    fn zone_index(&self, id: ZoneId) -> &'a ZoneIndex {
        self.db.zone_index(id)
    }

    fn scope_of(&self, zone: ZoneId, id: ScopeId) -> &'a Scope {
        self.zone_index(zone).scope(id)
    }

    fn event_of(&self, zone: ZoneId, slot: u32) -> &'a Arc<Event> {
        &self.zone_index(zone).events()[slot as usize]
    }

    /// Resolve an event node to its record
    pub fn as_event(&self) -> Option<&'a Arc<Event>> {
        match self.kind {
            NodeKind::Event(zone, slot) => Some(self.event_of(zone, slot)),
            _ => None,
        }
    }

    /// Resolve a scope node to its record and owning zone
    pub fn as_scope(&self) -> Option<(&'a ZoneIndex, &'a Scope)> {
        match self.kind {
            NodeKind::Scope(zone, id) => {
                Some((self.zone_index(zone), self.scope_of(zone, id)))
            }
            _ => None,
        }
    }

    /// Resolve a zone node to its index
    pub fn as_zone(&self) -> Option<&'a ZoneIndex> {
        match self.kind {
            NodeKind::Zone(id) => Some(self.zone_index(id)),
            _ => None,
        }
    }

    // ========== Node operations ==========

    /// Node kind tag
    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Database => NodeType::Database,
            NodeKind::Zone(_) => NodeType::Zone,
            NodeKind::Scope(..) => NodeType::Scope,
            NodeKind::Event(..) => NodeType::Event,
        }
    }

    /// Node name: `db` for the root, the zone name, the scope name, or the
    /// event's type name
    pub fn node_name(&self) -> String {
        match self.kind {
            NodeKind::Database => "db".to_string(),
            NodeKind::Zone(id) => self.zone_index(id).zone().name.clone(),
            NodeKind::Scope(zone, id) => self.scope_of(zone, id).name().to_string(),
            NodeKind::Event(zone, slot) => {
                self.event_of(zone, slot).event_type().name().to_string()
            }
        }
    }

    /// Node value: a scope's total duration or an event's first argument
    pub fn node_value(&self) -> Option<Value> {
        match self.kind {
            NodeKind::Database | NodeKind::Zone(_) => None,
            NodeKind::Scope(zone, id) => {
                self.scope_of(zone, id).total_duration().map(Value::Int)
            }
            NodeKind::Event(zone, slot) => {
                self.event_of(zone, slot).args().first().cloned()
            }
        }
    }

    /// Node position for document ordering: the root is position 0, zones
    /// use their first event, scopes their enter event, events their own
    pub fn node_position(&self) -> Position {
        match self.kind {
            NodeKind::Database => ROOT_POSITION,
            NodeKind::Zone(id) => self
                .zone_index(id)
                .events()
                .first()
                .map_or(ROOT_POSITION, |e| e.position()),
            NodeKind::Scope(zone, id) => self.scope_of(zone, id).enter_event().position(),
            NodeKind::Event(zone, slot) => self.event_of(zone, slot).position(),
        }
    }

    /// Attribute accessor.
    ///
    /// Zones expose `name`/`type`/`location`; scopes expose `name`,
    /// `depth`, `totalDuration`, `userDuration` and fall back to appended
    /// scope data; events expose `time`, `position` and their schema
    /// arguments by name.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match self.kind {
            NodeKind::Database => match name {
                "eventCount" => Some(Value::Int(self.db.total_event_count() as i64)),
                "zoneCount" => Some(Value::Int(self.db.zone_indices().len() as i64)),
                _ => None,
            },
            NodeKind::Zone(id) => {
                let zone = self.zone_index(id).zone();
                match name {
                    "name" => Some(Value::String(zone.name.clone())),
                    "type" => Some(Value::String(zone.zone_type.clone())),
                    "location" => Some(Value::String(zone.location.clone())),
                    _ => None,
                }
            }
            NodeKind::Scope(zone, id) => {
                let scope = self.scope_of(zone, id);
                match name {
                    "name" => Some(Value::String(scope.name().to_string())),
                    "depth" => Some(Value::Int(scope.depth() as i64)),
                    "totalDuration" => scope.total_duration().map(Value::Int),
                    "userDuration" => scope.user_duration().map(Value::Int),
                    _ => scope.data().remove(name),
                }
            }
            NodeKind::Event(zone, slot) => {
                let event = self.event_of(zone, slot);
                match name {
                    "time" => Some(Value::Int(event.time())),
                    "position" => Some(Value::Int(event.position() as i64)),
                    _ => event.arg(name).cloned(),
                }
            }
        }
    }

    /// Parent node: zones hang off the root, scopes off their parent scope
    /// or zone, events off the innermost scope containing their time
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        match self.kind {
            NodeKind::Database => None,
            NodeKind::Zone(_) => Some(NodeRef::root(self.db)),
            NodeKind::Scope(zone, id) => Some(match self.scope_of(zone, id).parent() {
                Some(parent) => NodeRef::scope(self.db, zone, parent),
                None => NodeRef::zone(self.db, zone),
            }),
            NodeKind::Event(zone, slot) => {
                let time = self.event_of(zone, slot).time();
                Some(match self.zone_index(zone).scope_at(time) {
                    Some(scope) => NodeRef::scope(self.db, zone, scope.id()),
                    None => NodeRef::zone(self.db, zone),
                })
            }
        }
    }

    fn is_leaf_event(event: &Event) -> bool {
        let ty = event.event_type();
        !ty.is_scope_enter() && !ty.is_scope_leave() && !ty.is_internal()
    }

    /// Child nodes in `(time, position)` order
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match self.kind {
            NodeKind::Database => self
                .db
                .zone_indices()
                .iter()
                .map(|z| NodeRef::zone(self.db, z.id()))
                .collect(),
            NodeKind::Zone(id) => {
                let zone = self.zone_index(id);
                self.container_children(id, |scope| scope.parent().is_none(), |time| {
                    zone.scope_at(time).is_none()
                })
            }
            NodeKind::Scope(zone_id, id) => {
                let zone = self.zone_index(zone_id);
                self.container_children(
                    zone_id,
                    |scope| scope.parent() == Some(id),
                    |time| zone.scope_at(time).is_some_and(|s| s.id() == id),
                )
            }
            NodeKind::Event(..) => Vec::new(),
        }
    }

    /// Children of a zone or scope container: the matching child scopes
    /// merged with the matching leaf events, in document order.
    fn container_children(
        &self,
        zone_id: ZoneId,
        scope_pred: impl Fn(&Scope) -> bool,
        event_pred: impl Fn(i64) -> bool,
    ) -> Vec<NodeRef<'a>> {
        let zone = self.zone_index(zone_id);
        let mut ordered: Vec<(i64, Position, NodeRef<'a>)> = Vec::new();
        for scope in zone.scopes().iter().filter(|s| scope_pred(s)) {
            let enter = scope.enter_event();
            ordered.push((
                enter.time(),
                enter.position(),
                NodeRef::scope(self.db, zone_id, scope.id()),
            ));
        }
        for (slot, event) in zone.events().iter().enumerate() {
            if Self::is_leaf_event(event) && event_pred(event.time()) {
                ordered.push((
                    event.time(),
                    event.position(),
                    NodeRef::event(self.db, zone_id, slot as u32),
                ));
            }
        }
        ordered.sort_by_key(|(time, position, _)| (*time, *position));
        ordered.into_iter().map(|(_, _, node)| node).collect()
    }

    /// Children whose name matches the optional name test
    pub fn children_matching(&self, name_test: Option<&str>) -> Vec<NodeRef<'a>> {
        self.children()
            .into_iter()
            .filter(|n| name_test.map_or(true, |t| n.node_name() == t))
            .collect()
    }

    /// All descendants in document order, excluding self
    pub fn descendants(&self) -> Vec<NodeRef<'a>> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants(&self, out: &mut Vec<NodeRef<'a>>) {
        for child in self.children() {
            out.push(child);
            child.collect_descendants(out);
        }
    }

    /// Descendants whose name matches the optional name test
    pub fn descendants_matching(&self, name_test: Option<&str>) -> Vec<NodeRef<'a>> {
        self.descendants()
            .into_iter()
            .filter(|n| name_test.map_or(true, |t| n.node_name() == t))
            .collect()
    }

    /// The following sibling in the parent's child order
    pub fn next_sibling(&self) -> Option<NodeRef<'a>> {
        let siblings = self.parent()?.children();
        let at = siblings.iter().position(|n| n == self)?;
        siblings.get(at + 1).copied()
    }

    /// The preceding sibling in the parent's child order
    pub fn previous_sibling(&self) -> Option<NodeRef<'a>> {
        let siblings = self.parent()?.children();
        let at = siblings.iter().position(|n| n == self)?;
        siblings.get(at.checked_sub(1)?).copied()
    }
}
