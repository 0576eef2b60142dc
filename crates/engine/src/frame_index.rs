//! Per-zone frame index
//!
//! Tracks the repeating `wtf.timing#frameStart` / `wtf.timing#frameEnd`
//! pairs that delimit frames of work (render loops, simulation ticks).
//! Frames are matched by frame number; a start without an end stays pending
//! until the end arrives, possibly in a later batch.
//!
//! The index is owned and populated by its [`ZoneIndex`](crate::ZoneIndex)
//! during the scope replay pass; it shares the zone's rewind discipline on
//! out-of-order batches.

use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracedb_core::{Event, TimeMicros};
use tracing::warn;

/// One frame: a matched start/end event pair.
#[derive(Debug, Clone)]
pub struct Frame {
    number: i64,
    start: Arc<Event>,
    end: Option<Arc<Event>>,
}

impl Frame {
    /// Frame number reported by the instrumented source
    pub fn number(&self) -> i64 {
        self.number
    }

    /// Start marker event
    pub fn start_event(&self) -> &Arc<Event> {
        &self.start
    }

    /// End marker event, if the frame has completed
    pub fn end_event(&self) -> Option<&Arc<Event>> {
        self.end.as_ref()
    }

    /// Frame start time
    pub fn start_time(&self) -> TimeMicros {
        self.start.time()
    }

    /// Frame end time, if completed
    pub fn end_time(&self) -> Option<TimeMicros> {
        self.end.as_ref().map(|e| e.time())
    }

    /// Frame duration, if completed
    pub fn duration(&self) -> Option<TimeMicros> {
        self.end_time().map(|end| end - self.start_time())
    }

    /// True if `t` falls inside the frame's closed time range
    pub fn contains(&self, t: TimeMicros) -> bool {
        match self.end_time() {
            Some(end) => self.start_time() <= t && t <= end,
            None => false,
        }
    }
}

/// Time-ordered list of frames with inter-frame timing.
#[derive(Default)]
pub struct FrameIndex {
    frames: Vec<Frame>,
    pending: FxHashMap<i64, usize>,
}

impl FrameIndex {
    /// Create an empty frame index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame start marker
    pub(crate) fn on_frame_start(&mut self, event: &Arc<Event>) {
        let number = event.arg_at(0).as_int().unwrap_or(0);
        let slot = self.frames.len();
        self.frames.push(Frame {
            number,
            start: Arc::clone(event),
            end: None,
        });
        if let Some(stale) = self.pending.insert(number, slot) {
            warn!(number, "frame restarted before its end marker; dropping stale frame start");
            let _ = stale;
        }
    }

    /// Record a frame end marker; unmatched ends are dropped.
    pub(crate) fn on_frame_end(&mut self, event: &Arc<Event>) {
        let number = event.arg_at(0).as_int().unwrap_or(0);
        match self.pending.remove(&number) {
            Some(slot) => self.frames[slot].end = Some(Arc::clone(event)),
            None => warn!(number, "frame end without a matching start; dropped"),
        }
    }

    /// Drop frames started at or after `t_min` and reopen frames whose end
    /// landed past it. Part of the zone rewind on out-of-order batches.
    pub(crate) fn rewind(&mut self, t_min: TimeMicros) {
        let keep = self.frames.partition_point(|f| f.start_time() < t_min);
        self.frames.truncate(keep);
        self.pending.clear();
        for (slot, frame) in self.frames.iter_mut().enumerate() {
            if frame.end_time().is_some_and(|t| t >= t_min) {
                frame.end = None;
            }
            if frame.end.is_none() {
                self.pending.insert(frame.number, slot);
            }
        }
    }

    /// Drop everything. Used by the full-rebuild fallback.
    pub(crate) fn clear(&mut self) {
        self.frames.clear();
        self.pending.clear();
    }

    /// Number of frames (pending frames included)
    pub fn count(&self) -> usize {
        self.frames.len()
    }

    /// All frames in start-time order
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The frame whose time range contains `t`
    pub fn frame_in_range(&self, t: TimeMicros) -> Option<&Frame> {
        let idx = self.frames.partition_point(|f| f.start_time() <= t);
        let frame = &self.frames[idx.checked_sub(1)?];
        frame.contains(t).then_some(frame)
    }

    /// Gap between a frame's start and the previous frame's end.
    /// None for the first frame or when the previous frame is unfinished.
    pub fn gap_to_previous(&self, index: usize) -> Option<TimeMicros> {
        let prev_end = self.frames.get(index.checked_sub(1)?)?.end_time()?;
        Some(self.frames.get(index)?.start_time() - prev_end)
    }

    /// Mean duration across completed frames
    pub fn average_duration(&self) -> Option<TimeMicros> {
        let (sum, n) = self
            .frames
            .iter()
            .filter_map(|f| f.duration())
            .fold((0i64, 0i64), |(s, n), d| (s + d, n + 1));
        (n > 0).then(|| sum / n)
    }

    /// Visit frames starting in the half-open range `[start, end)`
    pub fn for_each<F>(&self, start: TimeMicros, end: TimeMicros, mut f: F)
    where
        F: FnMut(&Frame),
    {
        let lower = self.frames.partition_point(|fr| fr.start_time() < start);
        for frame in &self.frames[lower..] {
            if frame.start_time() >= end {
                break;
            }
            f(frame);
        }
    }
}
