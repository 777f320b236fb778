//! The first-merge recorder: an O(k) amortized structure that tracks
//! each glyph's `k` earliest candidate merges against a scanned set of
//! overlapping neighbours, avoiding the O(n^2) pairwise scan a naive
//! implementation would need.

use rayon::prelude::*;

use crate::event::EventQueue;
use crate::glyph::{GlyphArena, GlyphId, MergeCandidate};
use crate::grow::GrowFn;

/// Accumulates the `k` earliest merge candidates for one probe glyph.
///
/// Candidates are kept sorted ascending by time; once full, a new candidate
/// only displaces the current worst (last) slot if it beats it.
pub struct FirstMergeRecorder {
    probe: GlyphId,
    capacity: usize,
    slots: Vec<MergeCandidate>,
}

impl FirstMergeRecorder {
    /// Begin recording candidates for `probe`, keeping at most `capacity`.
    #[must_use]
    pub fn start(probe: GlyphId, capacity: usize) -> Self {
        Self {
            probe,
            capacity: capacity.max(1),
            slots: Vec::with_capacity(capacity.max(1)),
        }
    }

    /// Consider `other` as a merge partner for the probe glyph at time `at`,
    /// computed by the caller via [`GrowFn::touch_time`]. Ignores `other`
    /// if it's the probe itself, or if it's not alive.
    pub fn record(&mut self, arena: &GlyphArena, other: GlyphId, at: f64) {
        if other == self.probe || !arena.is_alive(other) {
            return;
        }
        let candidate = MergeCandidate { at, partner: other };
        let pos = self.slots.partition_point(|c| *c < candidate);
        if pos < self.capacity {
            if self.slots.len() == self.capacity {
                self.slots.pop();
            }
            self.slots.insert(pos, candidate);
        }
    }

    /// Run [`Self::record`] against every candidate in `others`, computing
    /// each `touch_time` via `grow`. Serial hot path; see
    /// [`record_all_parallel`] for large candidate sets.
    pub fn record_all(
        &mut self,
        arena: &GlyphArena,
        others: impl IntoIterator<Item = GlyphId>,
        grow: &dyn GrowFn,
    ) {
        let probe_geom = arena.get(self.probe).geom();
        for other in others {
            if other == self.probe || !arena.is_alive(other) {
                continue;
            }
            let at = grow.touch_time(probe_geom, arena.get(other).geom());
            self.record(arena, other, at);
        }
    }

    /// Same as [`record_all`], but computes `touch_time` for every
    /// candidate across a `rayon` thread pool before folding results in
    /// serially. Only worth the fork/join overhead once `others` is large
    /// (see `EngineParams::parallel_recorder_threshold`).
    pub fn record_all_parallel(
        &mut self,
        arena: &GlyphArena,
        others: &[GlyphId],
        grow: &(dyn GrowFn + Sync),
    ) {
        let probe_geom = arena.get(self.probe).geom();
        let computed: Vec<(GlyphId, f64)> = others
            .par_iter()
            .filter(|&&other| other != self.probe && arena.is_alive(other))
            .map(|&other| (other, grow.touch_time(probe_geom, arena.get(other).geom())))
            .collect();
        for (other, at) in computed {
            self.record(arena, other, at);
        }
    }

    /// Number of candidates currently held (at most `capacity`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no candidates were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Flush the recorded candidates into the probe glyph's per-glyph merge
    /// heap and promote the best one into the global queue, registering the
    /// probe into each candidate partner's `tracked_by` set if `track` is
    /// enabled by the caller.
    pub fn finish(self, arena: &mut GlyphArena, queue: &mut EventQueue, track: bool) {
        for candidate in self.slots {
            arena.get_mut(self.probe).record_merge(candidate);
            if track {
                arena.get_mut(candidate.partner).tracked_by.insert(self.probe);
            }
        }
        arena.pop_merge_into(self.probe, queue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;
    use crate::glyph::{Glyph, Liveness};
    use crate::params::QueueBucketing;

    fn arena_with(n: usize) -> GlyphArena {
        let mut a = GlyphArena::new();
        for i in 0..n {
            let mut g = Glyph::new(Point::new(i as f64, 0.0), 1);
            g.alive = Liveness::Alive;
            a.insert(g);
        }
        a
    }

    #[test]
    fn keeps_only_the_k_earliest() {
        let arena = arena_with(5);
        let mut rec = FirstMergeRecorder::start(0, 2);
        rec.record(&arena, 1, 10.0);
        rec.record(&arena, 2, 3.0);
        rec.record(&arena, 3, 7.0);
        rec.record(&arena, 4, 1.0);
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.slots[0].at, 1.0);
        assert_eq!(rec.slots[1].at, 3.0);
    }

    #[test]
    fn ignores_self_and_dead() {
        let mut arena = arena_with(3);
        arena.get_mut(1).alive = Liveness::Dead;
        let mut rec = FirstMergeRecorder::start(0, 4);
        rec.record(&arena, 0, 1.0);
        rec.record(&arena, 1, 2.0);
        rec.record(&arena, 2, 3.0);
        assert_eq!(rec.len(), 1);
        assert_eq!(rec.slots[0].partner, 2);
    }

    #[test]
    fn finish_promotes_best_candidate_into_queue() {
        let mut arena = arena_with(3);
        let mut rec = FirstMergeRecorder::start(0, 4);
        rec.record(&arena, 1, 5.0);
        rec.record(&arena, 2, 2.0);
        let mut queue = EventQueue::new(QueueBucketing::None);
        rec.finish(&mut arena, &mut queue, true);
        let ev = queue.poll().unwrap();
        assert_eq!(ev.at, 2.0);
        assert!(arena.get(2).tracked_by.contains(&0));
    }
}
