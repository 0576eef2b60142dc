//! Future-like handles for deferred index creation.
//!
//! `create_event_index` returns a [`Deferred`] because a virtualized
//! backing store may need to load data before an index is usable. The
//! in-memory implementation always completes synchronously; the handle
//! keeps the call-site shape stable for that future seam.

/// A handle to a value that may not be ready yet.
///
/// In-memory databases only ever produce ready handles.
#[derive(Debug)]
pub struct Deferred<T> {
    value: Option<T>,
}

impl<T> Deferred<T> {
    /// Create an already-completed handle
    pub fn ready(value: T) -> Self {
        Self { value: Some(value) }
    }

    /// True once the value is available
    pub fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    /// Borrow the value if it is available
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Consume the handle, blocking until the value is available.
    ///
    /// Panics if the producer was dropped without completing; an in-memory
    /// database never does.
    pub fn wait(self) -> T {
        self.value.expect("deferred value never completed")
    }
}
