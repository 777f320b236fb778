//! Tagged events and the global priority queue.
//!
//! A single tagged variant (`Merge | OutOfCell`) with a uniform `at`
//! projection keeps the queue homogeneous instead of juggling separate
//! heaps per event type. Ordering is strictly by `at` ascending; ties are
//! broken deterministically by `(kind rank, glyph identity)` so that results
//! are reproducible across runs.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use crate::geom::Side;
use crate::glyph::GlyphId;
use crate::params::QueueBucketing;
use crate::quadtree::CellId;

/// Tagged event payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// `a` and `b` are predicted to touch. `b` is `None` only inside the
    /// nested-merge cascade, meaning "the glyph currently being assembled
    /// by this cascade".
    Merge {
        /// First participant.
        a: GlyphId,
        /// Second participant, or `None` for an in-cascade placeholder.
        b: Option<GlyphId>,
    },
    /// `glyph` will exit `cell` across `side` at the event's time.
    OutOfCell {
        /// The glyph predicted to cross a cell boundary.
        glyph: GlyphId,
        /// The cell it is currently registered against.
        cell: CellId,
        /// Which side it will cross.
        side: Side,
    },
}

impl EventKind {
    /// Deterministic tie-break key: event kind rank, then the lowest glyph
    /// identity mentioned (glyph ids are assigned in creation order, so this
    /// is reproducible across runs of the same input).
    fn tie_key(&self) -> (u8, usize) {
        match *self {
            EventKind::Merge { a, b } => {
                let lo = match b {
                    Some(b) => a.min(b),
                    None => a,
                };
                (0, lo)
            }
            EventKind::OutOfCell { glyph, .. } => (1, glyph),
        }
    }
}

/// A single scheduled occurrence.
#[derive(Clone, Copy, Debug)]
pub struct Event {
    /// Simulation time at which this event fires.
    pub at: f64,
    /// What kind of event this is.
    pub kind: EventKind,
}

impl Event {
    /// Construct a merge event. `at` is normalized: `-inf` (coincident
    /// points) becomes `0.0`.
    #[must_use]
    pub fn merge(a: GlyphId, b: Option<GlyphId>, at: f64) -> Self {
        Self {
            at: normalize_time(at),
            kind: EventKind::Merge { a, b },
        }
    }

    /// Construct an out-of-cell event.
    #[must_use]
    pub fn out_of_cell(glyph: GlyphId, cell: CellId, side: Side, at: f64) -> Self {
        Self {
            at: normalize_time(at),
            kind: EventKind::OutOfCell { glyph, cell, side },
        }
    }

    fn sort_key(&self) -> (OrderedFloat<f64>, u8, usize) {
        let (rank, id) = self.kind.tie_key();
        (OrderedFloat(self.at), rank, id)
    }
}

/// `-inf` (coincident glyphs) collapses to `t = 0`; everything else passes
/// through unchanged.
#[inline]
#[must_use]
pub fn normalize_time(at: f64) -> f64 {
    if at.is_infinite() && at.is_sign_negative() {
        0.0
    } else {
        at
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}
impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// One shard of a bucketed queue: a plain binary min-heap (via `Reverse`).
#[derive(Default)]
struct Bucket {
    heap: BinaryHeap<std::cmp::Reverse<Event>>,
}

impl Bucket {
    fn push(&mut self, ev: Event) {
        self.heap.push(std::cmp::Reverse(ev));
    }
    fn peek(&self) -> Option<&Event> {
        self.heap.peek().map(|r| &r.0)
    }
    fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|r| r.0)
    }
    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// The global event queue.
///
/// Minimum contract: `peek`, `poll`, `add`, `discard`, `size`. Optionally
/// shards into a chain of sub-queues; bucketing is purely an optimisation
/// and the trivial one-bucket case (the default) must be, and is, correct.
pub struct EventQueue {
    strategy: QueueBucketing,
    buckets: Vec<Bucket>,
    len: usize,
    discarded: usize,
}

impl EventQueue {
    /// Construct an empty queue using the given bucketing strategy.
    #[must_use]
    pub fn new(strategy: QueueBucketing) -> Self {
        Self {
            strategy,
            buckets: vec![Bucket::default()],
            len: 0,
            discarded: 0,
        }
    }

    /// Number of events currently queued (not counting discards).
    #[must_use]
    pub fn size(&self) -> usize {
        self.len
    }

    /// Whether the queue has no pending events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Count of events removed via [`Self::discard`] over the queue's
    /// lifetime (diagnostic only).
    #[must_use]
    pub fn discarded_count(&self) -> usize {
        self.discarded
    }

    /// Insert an event, routing it to the appropriate shard.
    pub fn add(&mut self, ev: Event) {
        let idx = self.bucket_index_for_insert(ev.at);
        self.ensure_bucket(idx);
        self.buckets[idx].push(ev);
        self.len += 1;
    }

    /// Return the globally earliest event without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&Event> {
        self.buckets
            .iter()
            .filter_map(Bucket::peek)
            .min_by(|a, b| a.cmp(b))
    }

    /// Remove and return the globally earliest event.
    pub fn poll(&mut self) -> Option<Event> {
        let idx = self.index_of_min_bucket()?;
        let ev = self.buckets[idx].pop();
        if ev.is_some() {
            self.len -= 1;
        }
        ev
    }

    /// Same as [`Self::poll`], but counted separately (discard statistics).
    pub fn discard(&mut self) -> Option<Event> {
        let ev = self.poll();
        if ev.is_some() {
            self.discarded += 1;
        }
        ev
    }

    fn index_of_min_bucket(&self) -> Option<usize> {
        self.buckets
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.peek().map(|e| (i, *e)))
            .min_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(i, _)| i)
    }

    fn ensure_bucket(&mut self, idx: usize) {
        while self.buckets.len() <= idx {
            self.buckets.push(Bucket::default());
        }
    }

    fn bucket_index_for_insert(&self, at: f64) -> usize {
        match self.strategy {
            QueueBucketing::None => 0,
            QueueBucketing::OnSize { k } => {
                // Spill to the next lazily-created queue once the current
                // head queue reaches `k` elements.
                let mut idx = 0;
                loop {
                    let existing_len = self.buckets.get(idx).map_or(0, Bucket::len);
                    if existing_len < k || idx + 1 >= usize::from(u16::MAX) {
                        return idx;
                    }
                    idx += 1;
                }
            }
            QueueBucketing::OnTimestamp {
                threshold,
                growth,
                limit,
            } => bucket_for_timestamp(at, threshold, growth, limit),
        }
    }
}

/// The *i*-th bucket owns `[threshold*(1-g^i)/(1-g), threshold*g^i)`
/// (widths growing geometrically); the last bucket is unbounded above.
fn bucket_for_timestamp(at: f64, threshold: f64, growth: f64, limit: usize) -> usize {
    if at < 0.0 || threshold <= 0.0 {
        return 0;
    }
    let mut lo = 0.0_f64;
    let mut width = threshold;
    for i in 0..limit {
        let hi = lo + width;
        if at < hi {
            return i;
        }
        lo = hi;
        width *= growth;
    }
    limit.saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bucket_orders_by_time() {
        let mut q = EventQueue::new(QueueBucketing::None);
        q.add(Event::merge(0, Some(1), 5.0));
        q.add(Event::merge(2, Some(3), 1.0));
        q.add(Event::merge(4, Some(5), 3.0));
        assert_eq!(q.size(), 3);
        assert_eq!(q.poll().unwrap().at, 1.0);
        assert_eq!(q.poll().unwrap().at, 3.0);
        assert_eq!(q.poll().unwrap().at, 5.0);
        assert!(q.poll().is_none());
    }

    #[test]
    fn ties_break_deterministically() {
        let mut q = EventQueue::new(QueueBucketing::None);
        q.add(Event::merge(5, Some(6), 1.0));
        q.add(Event::merge(1, Some(2), 1.0));
        q.add(Event::merge(3, Some(4), 1.0));
        // Tie-break picks the lowest glyph id among participants.
        let first = q.poll().unwrap();
        assert_eq!(first.kind, EventKind::Merge { a: 1, b: Some(2) });
    }

    #[test]
    fn discard_is_counted_separately_from_poll() {
        let mut q = EventQueue::new(QueueBucketing::None);
        q.add(Event::merge(0, Some(1), 1.0));
        q.add(Event::merge(2, Some(3), 2.0));
        q.discard();
        assert_eq!(q.discarded_count(), 1);
        assert_eq!(q.size(), 1);
    }

    #[test]
    fn on_size_bucketing_preserves_global_order() {
        let mut q = EventQueue::new(QueueBucketing::OnSize { k: 2 });
        for i in 0..10u32 {
            q.add(Event::merge(i as usize, None, f64::from(9 - i)));
        }
        let mut out = Vec::new();
        while let Some(e) = q.poll() {
            out.push(e.at);
        }
        let mut sorted = out.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(out, sorted);
    }

    #[test]
    fn on_timestamp_bucketing_preserves_global_order() {
        let mut q = EventQueue::new(QueueBucketing::OnTimestamp {
            threshold: 1.0,
            growth: 2.0,
            limit: 8,
        });
        let times = [0.1, 5.0, 100.0, 0.5, 2.0, 0.0, 50.0];
        for (i, t) in times.iter().enumerate() {
            q.add(Event::merge(i, None, *t));
        }
        let mut out = Vec::new();
        while let Some(e) = q.poll() {
            out.push(e.at);
        }
        let mut sorted = times.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(out, sorted);
    }
}
