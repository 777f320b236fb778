//! The reference O(n^2 log n) clustering algorithm: seed every pairwise
//! touch time, then repeatedly take the globally earliest one, skipping
//! pairs a prior merge has made stale. No quadtree involved.
//!
//! A merge moves the survivor to the weighted centroid of the two parts
//! and sums their weight (see [`crate::glyph::Glyph::absorb`]), so every
//! pairwise touch time computed against its old geometry is invalid the
//! moment it absorbs a partner. Each glyph carries a generation counter,
//! bumped on absorb; a popped [`PairEvent`] is discarded, same as a dead
//! endpoint, if either side's generation has moved on since it was
//! pushed, and fresh events are pushed for the survivor's new geometry
//! against every other glyph still alive.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use crate::dendrogram::Dendrogram;
use crate::geom::Point;
use crate::glyph::{Glyph, GlyphArena, GlyphId, Liveness};
use crate::grow::GrowFn;

use super::{CancelToken, ClusterOutcome};

#[derive(Clone, Copy, PartialEq, Eq)]
struct PairEvent {
    at: OrderedFloat<f64>,
    a: GlyphId,
    b: GlyphId,
    gen_a: u32,
    gen_b: u32,
}

impl PartialOrd for PairEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PairEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.at, self.a.min(self.b))
            .cmp(&(other.at, other.a.min(other.b)))
            .then(self.a.max(self.b).cmp(&other.a.max(other.b)))
    }
}

/// Cluster `points` (centre, weight) under `grow` using the naive
/// all-pairs algorithm.
#[must_use]
pub fn cluster_naive(
    points: &[(Point, u32)],
    grow: &dyn GrowFn,
    cancel: &CancelToken,
) -> ClusterOutcome {
    let mut arena = GlyphArena::new();
    for &(point, weight) in points {
        let mut g = Glyph::new(point, weight);
        g.alive = Liveness::Alive;
        arena.insert(g);
    }

    let mut dendrogram = Dendrogram::new();
    for id in arena.ids() {
        dendrogram.touch_leaf(id, arena.get(id).weight);
    }

    let mut generation: Vec<u32> = vec![0; arena.len()];

    let mut heap: BinaryHeap<Reverse<PairEvent>> = BinaryHeap::new();
    for i in arena.ids() {
        for j in (i + 1)..arena.len() {
            push_pair(&mut heap, &arena, &generation, i, j, grow);
        }
    }

    let mut processed = 0;
    let mut discarded = 0;
    let mut alive_count = arena.len();

    while alive_count > 1 {
        if cancel.is_cancelled() {
            return ClusterOutcome {
                dendrogram,
                events_processed: processed,
                events_discarded: discarded,
                cancelled: true,
            };
        }
        let Some(Reverse(ev)) = heap.pop() else {
            break;
        };
        if !arena.is_alive(ev.a)
            || !arena.is_alive(ev.b)
            || generation[ev.a] != ev.gen_a
            || generation[ev.b] != ev.gen_b
        {
            discarded += 1;
            continue;
        }
        let survivor = ev.a.min(ev.b);
        let dead = ev.a.max(ev.b);

        let dead_geom = (arena.get(dead).point, arena.get(dead).weight);
        arena.get_mut(survivor).absorb(dead_geom.0, dead_geom.1);
        arena.get_mut(dead).alive = Liveness::Dead;
        generation[survivor] += 1;

        dendrogram.merge(survivor, &[dead], ev.at.0, arena.get(survivor).weight);
        alive_count -= 1;
        processed += 1;

        for other in arena.ids() {
            if other != survivor && arena.is_alive(other) {
                push_pair(&mut heap, &arena, &generation, survivor, other, grow);
            }
        }
    }

    ClusterOutcome {
        dendrogram,
        events_processed: processed,
        events_discarded: discarded,
        cancelled: false,
    }
}

fn push_pair(
    heap: &mut BinaryHeap<Reverse<PairEvent>>,
    arena: &GlyphArena,
    generation: &[u32],
    i: GlyphId,
    j: GlyphId,
    grow: &dyn GrowFn,
) {
    let at = grow.touch_time(arena.get(i).geom(), arena.get(j).geom());
    heap.push(Reverse(PairEvent {
        at: OrderedFloat(crate::event::normalize_time(at)),
        a: i,
        b: j,
        gen_a: generation[i],
        gen_b: generation[j],
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grow::LinearSquares;

    #[test]
    fn three_colinear_points_merge_nearest_pair_first() {
        let points = vec![
            (Point::new(0.0, 0.0), 1),
            (Point::new(10.0, 0.0), 1),
            (Point::new(11.0, 0.0), 1),
        ];
        let outcome = cluster_naive(&points, &LinearSquares, &CancelToken::new());
        assert!(!outcome.cancelled);
        assert!(outcome.dendrogram.root().is_some());
        assert_eq!(outcome.events_processed, 2);
    }

    #[test]
    fn single_glyph_produces_no_merges() {
        let points = vec![(Point::new(0.0, 0.0), 1)];
        let outcome = cluster_naive(&points, &LinearSquares, &CancelToken::new());
        assert!(outcome.dendrogram.root().is_none());
        assert_eq!(outcome.events_processed, 0);
    }

    #[test]
    fn cancellation_stops_before_convergence() {
        let points: Vec<_> = (0..50)
            .map(|i| (Point::new(f64::from(i) * 100.0, 0.0), 1))
            .collect();
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = cluster_naive(&points, &LinearSquares, &cancel);
        assert!(outcome.cancelled);
    }
}
