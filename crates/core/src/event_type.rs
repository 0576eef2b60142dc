//! Event type schemas and the interning registry
//!
//! Every ingested event references an interned [`EventType`]: a
//! fully-qualified name (`wtf.scope#enter`), an ordered argument schema, and
//! a flag bitset. The registry hands out stable `Arc<EventType>` handles;
//! lookup by name is O(1).
//!
//! The fixed built-in types (zone create, scope enter/leave, flow
//! branch/extend/terminate, data appenders, frame markers) are pre-registered
//! at construction and carry a [`BuiltinKind`] discriminant so the ingest
//! path classifies them without string comparison.

use crate::error::{Error, Result};
use crate::value::Value;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Well-known built-in event type names.
pub mod names {
    /// Zone creation
    pub const ZONE_CREATE: &str = "wtf.zone#create";
    /// Scope enter
    pub const SCOPE_ENTER: &str = "wtf.scope#enter";
    /// Scope leave
    pub const SCOPE_LEAVE: &str = "wtf.scope#leave";
    /// Append a key/value pair to the current scope
    pub const SCOPE_APPEND_DATA: &str = "wtf.scope#appendData";
    /// Branch a new flow (optionally from a parent flow)
    pub const FLOW_BRANCH: &str = "wtf.flow#branch";
    /// Extend an existing flow
    pub const FLOW_EXTEND: &str = "wtf.flow#extend";
    /// Terminate a flow
    pub const FLOW_TERMINATE: &str = "wtf.flow#terminate";
    /// Append a key/value pair to a flow
    pub const FLOW_APPEND_DATA: &str = "wtf.flow#appendData";
    /// Frame start marker
    pub const FRAME_START: &str = "wtf.timing#frameStart";
    /// Frame end marker
    pub const FRAME_END: &str = "wtf.timing#frameEnd";
}

/// Kind of a single schema argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgKind {
    /// Boolean
    Bool,
    /// Signed or unsigned integer (stored as i64)
    Int,
    /// Floating point
    Float,
    /// String (ascii or utf8 on the wire)
    Str,
    /// Any value, including arrays and objects
    Any,
}

impl ArgKind {
    /// Parse a wire kind token (`uint32`, `ascii`, `any`, ...)
    fn from_token(token: &str) -> Option<ArgKind> {
        match token {
            "bool" => Some(ArgKind::Bool),
            "int8" | "int16" | "int32" | "int64" | "uint8" | "uint16" | "uint32" | "uint64" => {
                Some(ArgKind::Int)
            }
            "float32" | "float64" => Some(ArgKind::Float),
            "ascii" | "utf8" => Some(ArgKind::Str),
            "any" => Some(ArgKind::Any),
            _ => None,
        }
    }

    /// Check that a value is acceptable for this kind. `Null` is always
    /// accepted (omitted optional argument).
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ArgKind::Any, _) => true,
            (ArgKind::Bool, Value::Bool(_)) => true,
            (ArgKind::Int, Value::Int(_)) => true,
            (ArgKind::Float, Value::Float(_)) | (ArgKind::Float, Value::Int(_)) => true,
            (ArgKind::Str, Value::String(_)) => true,
            _ => false,
        }
    }
}

/// A named argument in an event type schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    /// Argument name, unique within the schema
    pub name: String,
    /// Argument kind
    pub kind: ArgKind,
}

impl Argument {
    /// Create an argument
    pub fn new(name: impl Into<String>, kind: ArgKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Flag bitset carried by every event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventTypeFlags(u32);

impl EventTypeFlags {
    /// No flags
    pub const NONE: EventTypeFlags = EventTypeFlags(0);
    /// Excluded from user totals and query result sets, still indexed
    pub const INTERNAL: EventTypeFlags = EventTypeFlags(1 << 0);
    /// Opens a scope
    pub const SCOPE_ENTER: EventTypeFlags = EventTypeFlags(1 << 1);
    /// Closes the innermost open scope
    pub const SCOPE_LEAVE: EventTypeFlags = EventTypeFlags(1 << 2);
    /// Defined by the trace format, not user instrumentation
    pub const BUILTIN: EventTypeFlags = EventTypeFlags(1 << 3);
    /// Appends key/value data to the flow named by the event's `id` argument
    pub const APPEND_FLOW_DATA: EventTypeFlags = EventTypeFlags(1 << 4);
    /// Appends key/value data to the innermost open scope
    pub const APPEND_SCOPE_DATA: EventTypeFlags = EventTypeFlags(1 << 5);

    /// Union of two flag sets
    #[inline]
    pub const fn union(self, other: EventTypeFlags) -> EventTypeFlags {
        EventTypeFlags(self.0 | other.0)
    }

    /// True if every flag in `other` is set in `self`
    #[inline]
    pub const fn contains(self, other: EventTypeFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for EventTypeFlags {
    type Output = EventTypeFlags;
    fn bitor(self, rhs: EventTypeFlags) -> EventTypeFlags {
        self.union(rhs)
    }
}

/// Discriminant for the fixed built-in types.
///
/// Lets the ingest path route builtins without comparing names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    /// `wtf.zone#create`
    ZoneCreate,
    /// `wtf.scope#enter`
    ScopeEnter,
    /// `wtf.scope#leave`
    ScopeLeave,
    /// `wtf.scope#appendData`
    ScopeAppendData,
    /// `wtf.flow#branch`
    FlowBranch,
    /// `wtf.flow#extend`
    FlowExtend,
    /// `wtf.flow#terminate`
    FlowTerminate,
    /// `wtf.flow#appendData`
    FlowAppendData,
    /// `wtf.timing#frameStart`
    FrameStart,
    /// `wtf.timing#frameEnd`
    FrameEnd,
}

/// An interned event schema.
///
/// Instances are owned by the [`EventTypeRegistry`] and shared as
/// `Arc<EventType>` handles; two events of the same type share one instance.
#[derive(Debug)]
pub struct EventType {
    name: String,
    args: Vec<Argument>,
    flags: EventTypeFlags,
    builtin: Option<BuiltinKind>,
}

impl EventType {
    /// Create a user-defined event type
    pub fn new(name: impl Into<String>, args: Vec<Argument>, flags: EventTypeFlags) -> Self {
        Self {
            name: name.into(),
            args,
            flags,
            builtin: None,
        }
    }

    fn builtin(
        name: &str,
        args: Vec<Argument>,
        flags: EventTypeFlags,
        kind: BuiltinKind,
    ) -> Self {
        Self {
            name: name.to_string(),
            args,
            flags: flags | EventTypeFlags::BUILTIN,
            builtin: Some(kind),
        }
    }

    /// Fully-qualified type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered argument schema
    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    /// Flag bitset
    pub fn flags(&self) -> EventTypeFlags {
        self.flags
    }

    /// Built-in discriminant, if this is a fixed format type
    pub fn builtin_kind(&self) -> Option<BuiltinKind> {
        self.builtin
    }

    /// True if the INTERNAL flag is set
    #[inline]
    pub fn is_internal(&self) -> bool {
        self.flags.contains(EventTypeFlags::INTERNAL)
    }

    /// True if this type opens a scope
    #[inline]
    pub fn is_scope_enter(&self) -> bool {
        self.flags.contains(EventTypeFlags::SCOPE_ENTER)
    }

    /// True if this type closes a scope
    #[inline]
    pub fn is_scope_leave(&self) -> bool {
        self.flags.contains(EventTypeFlags::SCOPE_LEAVE)
    }

    /// Schema position of the named argument
    pub fn arg_index(&self, name: &str) -> Option<usize> {
        self.args.iter().position(|a| a.name == name)
    }

    /// Parse a signature string into an event type.
    ///
    /// Signatures follow the declaration form used by instrumented sources:
    /// `"my.module#operation(uint32 count, ascii label)"`. A bare name with
    /// no parenthesis declares a zero-argument type.
    pub fn parse(signature: &str, flags: EventTypeFlags) -> Result<Self> {
        let signature = signature.trim();
        let (name, arg_list) = match signature.find('(') {
            None => (signature, ""),
            Some(open) => {
                let close = signature
                    .rfind(')')
                    .ok_or_else(|| Error::InvalidSignature(signature.to_string()))?;
                if close < open {
                    return Err(Error::InvalidSignature(signature.to_string()));
                }
                (&signature[..open], &signature[open + 1..close])
            }
        };
        if name.is_empty() {
            return Err(Error::InvalidSignature(signature.to_string()));
        }

        let mut args = Vec::new();
        for part in arg_list.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (kind_token, arg_name) = part
                .split_once(char::is_whitespace)
                .ok_or_else(|| Error::InvalidSignature(signature.to_string()))?;
            let kind = ArgKind::from_token(kind_token)
                .ok_or_else(|| Error::UnknownArgKind(kind_token.to_string()))?;
            args.push(Argument::new(arg_name.trim(), kind));
        }

        Ok(EventType::new(name, args, flags))
    }
}

/// Interning registry of event type schemas.
///
/// Populated by the source adapter before any event references a type; the
/// built-in types are pre-registered at construction. Registration is
/// first-wins per name: re-registering an existing name returns the
/// original handle.
pub struct EventTypeRegistry {
    by_name: FxHashMap<String, Arc<EventType>>,
}

impl EventTypeRegistry {
    /// Create a registry with the built-in types pre-registered
    pub fn new() -> Self {
        use ArgKind::*;
        use BuiltinKind::*;

        let mut registry = Self {
            by_name: FxHashMap::default(),
        };

        let internal = EventTypeFlags::INTERNAL;
        let builtins = [
            EventType::builtin(
                names::ZONE_CREATE,
                vec![
                    Argument::new("name", Str),
                    Argument::new("type", Str),
                    Argument::new("location", Str),
                ],
                internal,
                ZoneCreate,
            ),
            EventType::builtin(
                names::SCOPE_ENTER,
                vec![Argument::new("name", Str)],
                EventTypeFlags::SCOPE_ENTER,
                ScopeEnter,
            ),
            EventType::builtin(
                names::SCOPE_LEAVE,
                vec![],
                EventTypeFlags::SCOPE_LEAVE,
                ScopeLeave,
            ),
            EventType::builtin(
                names::SCOPE_APPEND_DATA,
                vec![Argument::new("name", Str), Argument::new("value", Any)],
                internal | EventTypeFlags::APPEND_SCOPE_DATA,
                ScopeAppendData,
            ),
            EventType::builtin(
                names::FLOW_BRANCH,
                vec![
                    Argument::new("id", Int),
                    Argument::new("parentId", Int),
                    Argument::new("name", Str),
                ],
                EventTypeFlags::NONE,
                FlowBranch,
            ),
            EventType::builtin(
                names::FLOW_EXTEND,
                vec![Argument::new("id", Int), Argument::new("name", Str)],
                EventTypeFlags::NONE,
                FlowExtend,
            ),
            EventType::builtin(
                names::FLOW_TERMINATE,
                vec![Argument::new("id", Int), Argument::new("name", Str)],
                EventTypeFlags::NONE,
                FlowTerminate,
            ),
            EventType::builtin(
                names::FLOW_APPEND_DATA,
                vec![
                    Argument::new("id", Int),
                    Argument::new("name", Str),
                    Argument::new("value", Any),
                ],
                internal | EventTypeFlags::APPEND_FLOW_DATA,
                FlowAppendData,
            ),
            EventType::builtin(
                names::FRAME_START,
                vec![Argument::new("number", Int)],
                EventTypeFlags::NONE,
                FrameStart,
            ),
            EventType::builtin(
                names::FRAME_END,
                vec![Argument::new("number", Int)],
                EventTypeFlags::NONE,
                FrameEnd,
            ),
        ];

        for ty in builtins {
            registry.register(ty);
        }
        registry
    }

    /// Intern an event type and return its stable handle.
    ///
    /// If a type with the same name is already registered, the existing
    /// handle is returned and the argument is dropped.
    pub fn register(&mut self, event_type: EventType) -> Arc<EventType> {
        if let Some(existing) = self.by_name.get(event_type.name()) {
            return Arc::clone(existing);
        }
        let handle = Arc::new(event_type);
        self.by_name
            .insert(handle.name().to_string(), Arc::clone(&handle));
        handle
    }

    /// Parse and intern a signature string
    pub fn register_signature(
        &mut self,
        signature: &str,
        flags: EventTypeFlags,
    ) -> Result<Arc<EventType>> {
        let ty = EventType::parse(signature, flags)?;
        Ok(self.register(ty))
    }

    /// Look up a type handle by name
    pub fn lookup(&self, name: &str) -> Option<Arc<EventType>> {
        self.by_name.get(name).cloned()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True if no types are registered (never the case after `new`)
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for EventTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
