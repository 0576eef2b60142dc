//! Unified error types.
//!
//! This module provides a clean error type that wraps internal errors
//! and presents a consistent interface to users.
//!
//! Data errors on the ingest path never surface here: unmatched scope
//! leaves become `SOURCE_ERROR` notifications and ingest continues.
//! Structural contract violations (nested batches, inserts outside a
//! batch) are programmer errors and panic instead.

use thiserror::Error;

/// All tracedb errors.
///
/// This is the canonical error type for fallible operations on the public
/// surface, chiefly query parsing and event type registration.
#[derive(Debug, Error)]
pub enum Error {
    /// A query string failed to parse or compile
    #[error(transparent)]
    Query(#[from] tracedb_query::QueryError),

    /// An event type signature or name was rejected by the registry
    #[error(transparent)]
    EventType(#[from] tracedb_core::Error),
}

/// Result type for tracedb operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True if this error came from query parsing
    pub fn is_query(&self) -> bool {
        matches!(self, Error::Query(_))
    }
}
