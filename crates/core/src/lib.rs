//! # tracedb-core
//!
//! Canonical types for the trace database: the argument [`Value`] model,
//! interned [`EventType`] schemas and their registry, the ingested
//! [`Event`] record, zone identity, and the small id/time types shared by
//! the engine and query layers.

#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod event_type;
pub mod types;
pub mod value;
pub mod zone;

pub use error::{Error, Result};
pub use event::Event;
pub use event_type::{
    names, ArgKind, Argument, BuiltinKind, EventType, EventTypeFlags, EventTypeRegistry,
};
pub use types::{EventIndexId, FlowId, Position, ScopeId, TimeMicros, ZoneId, ROOT_POSITION};
pub use value::Value;
pub use zone::Zone;
