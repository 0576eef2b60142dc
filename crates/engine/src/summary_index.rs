//! Whole-stream summary index
//!
//! Maintains the first/last event time, the total observed event count, and
//! coarse power-of-two time buckets used for fast overviews. Buckets track
//! an event count and an approximate duration (the time span observed
//! inside the bucket); they are sparse, so idle stretches cost nothing.
//!
//! Invariant maintenance is deferred to batch boundaries: inserts
//! accumulate a pending min/max that is folded into the first/last times at
//! `end_inserting`.

use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracedb_core::{Event, TimeMicros};

/// Default bucket granularity: 2^20 microseconds, about one second.
pub const DEFAULT_GRANULARITY_SHIFT: u32 = 20;

/// One coarse time bucket.
#[derive(Debug, Clone, Copy)]
pub struct SummaryBucket {
    count: u64,
    min_time: TimeMicros,
    max_time: TimeMicros,
}

impl SummaryBucket {
    fn new(time: TimeMicros) -> Self {
        Self {
            count: 1,
            min_time: time,
            max_time: time,
        }
    }

    fn observe(&mut self, time: TimeMicros) {
        self.count += 1;
        self.min_time = self.min_time.min(time);
        self.max_time = self.max_time.max(time);
    }

    /// Number of events observed in this bucket
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Approximate busy duration: the span between the earliest and latest
    /// event observed in the bucket
    pub fn approximate_duration(&self) -> TimeMicros {
        self.max_time - self.min_time
    }
}

/// Coarse time-bucketed view of the whole event stream.
pub struct SummaryIndex {
    granularity_shift: u32,
    buckets: FxHashMap<i64, SummaryBucket>,
    first_time: Option<TimeMicros>,
    last_time: Option<TimeMicros>,
    total_count: u64,
    inserting: bool,
    pending_min: Option<TimeMicros>,
    pending_max: Option<TimeMicros>,
}

impl SummaryIndex {
    /// Create a summary index with the given bucket granularity
    /// (bucket width = `1 << granularity_shift` microseconds)
    pub fn new(granularity_shift: u32) -> Self {
        Self {
            granularity_shift,
            buckets: FxHashMap::default(),
            first_time: None,
            last_time: None,
            total_count: 0,
            inserting: false,
            pending_min: None,
            pending_max: None,
        }
    }

    #[inline]
    fn bucket_key(&self, time: TimeMicros) -> i64 {
        time >> self.granularity_shift
    }

    /// Enter the mutable phase for a batch
    pub fn begin_inserting(&mut self) {
        assert!(!self.inserting, "summary index already inserting");
        self.inserting = true;
        self.pending_min = None;
        self.pending_max = None;
    }

    /// Observe one event. The summary sees every event, internal included.
    pub fn insert_event(&mut self, event: &Arc<Event>) {
        assert!(self.inserting, "summary insert outside a batch");
        let time = event.time();
        self.total_count += 1;
        self.pending_min = Some(self.pending_min.map_or(time, |t| t.min(time)));
        self.pending_max = Some(self.pending_max.map_or(time, |t| t.max(time)));
        self.buckets
            .entry(self.bucket_key(time))
            .and_modify(|b| b.observe(time))
            .or_insert_with(|| SummaryBucket::new(time));
    }

    /// Fold the batch window into the stream first/last times
    pub fn end_inserting(&mut self) {
        assert!(self.inserting, "summary end_inserting outside a batch");
        self.inserting = false;
        if let Some(min) = self.pending_min {
            self.first_time = Some(self.first_time.map_or(min, |t| t.min(min)));
        }
        if let Some(max) = self.pending_max {
            self.last_time = Some(self.last_time.map_or(max, |t| t.max(max)));
        }
    }

    /// Time of the earliest observed event
    pub fn first_time(&self) -> Option<TimeMicros> {
        self.first_time
    }

    /// Time of the latest observed event
    pub fn last_time(&self) -> Option<TimeMicros> {
        self.last_time
    }

    /// Total number of observed events (internal events included)
    pub fn count(&self) -> u64 {
        self.total_count
    }

    /// Bucket width in microseconds
    pub fn granularity(&self) -> TimeMicros {
        1 << self.granularity_shift
    }

    /// Visit the buckets intersecting the half-open range `[start, end)` in
    /// time order. The callback receives the bucket start time and the
    /// bucket.
    pub fn for_each_bucket<F>(&self, start: TimeMicros, end: TimeMicros, mut f: F)
    where
        F: FnMut(TimeMicros, &SummaryBucket),
    {
        if end <= start {
            return;
        }
        let first = self.bucket_key(start);
        let last = self.bucket_key(end - 1);
        for key in first..=last {
            if let Some(bucket) = self.buckets.get(&key) {
                f(key << self.granularity_shift, bucket);
            }
        }
    }
}
