//! Core error types
//!
//! Data-shaped errors on the ingest boundary (bad signatures, unknown
//! types). Structural contract violations — inserting outside a batch,
//! nesting batches — are programmer errors and assert instead; the error
//! enum is reserved for conditions a caller can meaningfully handle.

use thiserror::Error;

/// Errors raised by the core type layer.
#[derive(Debug, Error)]
pub enum Error {
    /// An event type signature string could not be parsed
    #[error("invalid event type signature: {0}")]
    InvalidSignature(String),

    /// A signature used an argument kind the wire format does not define
    #[error("unknown argument kind: {0}")]
    UnknownArgKind(String),

    /// An event referenced a type name the registry has never seen
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
