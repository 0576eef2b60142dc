//! # tracedb-engine
//!
//! The ingestion and indexing engine: the [`Database`] ingest coordinator,
//! the whole-stream [`SummaryIndex`], per-name [`EventIndex`]es, per-zone
//! [`ZoneIndex`]es with scope-forest reconstruction and [`FrameIndex`]es,
//! the [`FlowTracker`], and the [`NodeRef`] tree view consumed by the query
//! layer.
//!
//! All mutation flows through the coordinator's batch protocol; reads occur
//! between batches. See the module docs of [`database`] and [`zone_index`]
//! for the protocol details.

#![warn(missing_docs)]

pub mod database;
pub mod event_index;
pub mod flow;
pub mod frame_index;
pub mod node;
pub mod summary_index;
pub mod zone_index;

pub use database::{
    Database, DatabaseEvent, EngineConfig, Observer, SourceInfo, DEFAULT_ZONE_NAME,
};
pub use event_index::EventIndex;
pub use flow::{Flow, FlowTracker};
pub use frame_index::{Frame, FrameIndex};
pub use node::{NodeRef, NodeType};
pub use summary_index::{SummaryBucket, SummaryIndex, DEFAULT_GRANULARITY_SHIFT};
pub use zone_index::{IngestError, Scope, ZoneIndex, DEFAULT_REBUILD_WINDOW_CAP};
