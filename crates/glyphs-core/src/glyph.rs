//! Glyph identity, liveness, per-glyph event caches, and cell
//! membership.
//!
//! Glyphs live in an arena (`GlyphArena`); cross-references to quadtree
//! cells and other glyphs are plain indices, not owned pointers, so the
//! graph of mutual references never needs `Rc`/`RefCell`.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use ordered_float::OrderedFloat;

use crate::event::{Event, EventQueue};
use crate::geom::{Point, Side};
use crate::grow::GlyphGeom;
use crate::quadtree::CellId;

/// Arena index identifying a glyph. Assigned in creation order, which is
/// also what the event tie-break rule relies on for reproducibility.
pub type GlyphId = usize;

/// Monotone lifecycle state: `Unborn -> Alive -> Dead`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Liveness {
    /// Constructed but not yet wired into the quadtree/queues.
    Unborn,
    /// Participating in the simulation.
    Alive,
    /// Merged away; lingers in caches until discovered and discarded.
    Dead,
}

/// A pending merge candidate recorded against one glyph (the partner is
/// implicit: "the other side" of this glyph's per-glyph heap).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MergeCandidate {
    /// Predicted touch time.
    pub at: f64,
    /// The other glyph in the predicted merge.
    pub partner: GlyphId,
}

impl Eq for MergeCandidate {}
impl PartialOrd for MergeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for MergeCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        (OrderedFloat(self.at), self.partner).cmp(&(OrderedFloat(other.at), other.partner))
    }
}

/// A pending boundary-crossing candidate recorded against one glyph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExitCandidate {
    /// Predicted exit time.
    pub at: f64,
    /// The cell being exited.
    pub cell: CellId,
    /// Which side will be crossed.
    pub side: Side,
}

impl Eq for ExitCandidate {}
impl PartialOrd for ExitCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ExitCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        OrderedFloat(self.at).cmp(&OrderedFloat(other.at))
    }
}

/// The weighted centroid and summed weight of two glyph parts being
/// merged. Associative: folding a chain of merges pairwise in any order
/// yields the same centroid as combining every leaf at once.
#[must_use]
pub fn weighted_merge(a: (Point, u32), b: (Point, u32)) -> (Point, u32) {
    let total = a.1 + b.1;
    let wa = f64::from(a.1);
    let wb = f64::from(b.1);
    let x = a.0.x.mul_add(wa, b.0.x * wb) / f64::from(total);
    let y = a.0.y.mul_add(wa, b.0.y * wb) / f64::from(total);
    (Point::new(x, y), total)
}

/// A growing object with mutable `(x, y, weight)` (updated on merge via
/// [`Glyph::absorb`]), liveness, cell membership, and event caches.
#[derive(Debug)]
pub struct Glyph {
    /// Centre point. Moves to the weighted centroid on [`Glyph::absorb`].
    pub point: Point,
    /// Integer weight, always >= 1. Summed on [`Glyph::absorb`].
    pub weight: u32,
    /// Lifecycle state.
    pub alive: Liveness,
    /// Leaf cells currently intersecting this glyph, insertion order,
    /// duplicate-free.
    pub cells: Vec<CellId>,
    /// Other glyphs that recorded *their* first merge as being with this
    /// one (only populated when tracking is requested); used to repair
    /// their caches when this glyph dies.
    pub tracked_by: HashSet<GlyphId>,
    merge_events: BinaryHeap<Reverse<MergeCandidate>>,
    out_of_cell_events: BinaryHeap<Reverse<ExitCandidate>>,
}

impl Glyph {
    /// Construct a new, unborn glyph.
    #[must_use]
    pub fn new(point: Point, weight: u32) -> Self {
        Self {
            point,
            weight,
            alive: Liveness::Unborn,
            cells: Vec::new(),
            tracked_by: HashSet::new(),
            merge_events: BinaryHeap::new(),
            out_of_cell_events: BinaryHeap::new(),
        }
    }

    /// This glyph's geometry, as consumed by a [`crate::grow::GrowFn`].
    #[must_use]
    pub fn geom(&self) -> GlyphGeom {
        GlyphGeom::new(self.point, self.weight)
    }

    /// Whether this glyph is currently alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive == Liveness::Alive
    }

    /// Add a leaf cell to this glyph's membership list. No-op (other than a
    /// debug assertion) if already present — duplicates are forbidden.
    pub fn add_cell(&mut self, cell: CellId) {
        debug_assert!(
            !self.cells.contains(&cell),
            "glyph already registered in cell {cell}"
        );
        self.cells.push(cell);
    }

    /// Remove a leaf cell from this glyph's membership list.
    pub fn remove_cell(&mut self, cell: CellId) {
        if let Some(pos) = self.cells.iter().position(|&c| c == cell) {
            self.cells.swap_remove(pos);
        }
    }

    /// Queue a candidate merge in this glyph's per-glyph min-heap.
    pub fn record_merge(&mut self, candidate: MergeCandidate) {
        self.merge_events.push(Reverse(candidate));
    }

    /// Queue a candidate boundary crossing in this glyph's per-glyph
    /// min-heap.
    pub fn record_out_of_cell(&mut self, candidate: ExitCandidate) {
        self.out_of_cell_events.push(Reverse(candidate));
    }

    /// Absorb `(other_point, other_weight)` into this glyph: recompute
    /// `point`/`weight` as the weighted centroid and summed weight, and
    /// drop every cached merge/exit candidate, since they were predicted
    /// against the geometry this glyph is about to stop having. Callers
    /// are responsible for re-deriving fresh candidates afterwards (the
    /// quadtree/recorder machinery does this on reinsertion).
    pub fn absorb(&mut self, other_point: Point, other_weight: u32) {
        let (point, weight) = weighted_merge((self.point, self.weight), (other_point, other_weight));
        self.point = point;
        self.weight = weight;
        self.merge_events.clear();
        self.out_of_cell_events.clear();
    }
}

/// Owning store of glyphs, addressed by [`GlyphId`].
#[derive(Debug, Default)]
pub struct GlyphArena {
    glyphs: Vec<Glyph>,
}

impl GlyphArena {
    /// Construct an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self { glyphs: Vec::new() }
    }

    /// Insert a new glyph, returning its id.
    pub fn insert(&mut self, glyph: Glyph) -> GlyphId {
        self.glyphs.push(glyph);
        self.glyphs.len() - 1
    }

    /// Number of glyphs ever created (alive, dead, or unborn).
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Whether the arena holds no glyphs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Immutable access to a glyph.
    #[must_use]
    pub fn get(&self, id: GlyphId) -> &Glyph {
        &self.glyphs[id]
    }

    /// Mutable access to a glyph.
    pub fn get_mut(&mut self, id: GlyphId) -> &mut Glyph {
        &mut self.glyphs[id]
    }

    /// Whether a glyph is currently alive.
    #[must_use]
    pub fn is_alive(&self, id: GlyphId) -> bool {
        self.glyphs[id].is_alive()
    }

    /// Iterate all glyph ids.
    pub fn ids(&self) -> impl Iterator<Item = GlyphId> {
        0..self.glyphs.len()
    }

    /// Discard stale heads (dead partner) from `id`'s merge cache; on the
    /// first live head, promote it into `queue` and register `id` in the
    /// partner's `tracked_by`. Returns whether an event was promoted.
    pub fn pop_merge_into(&mut self, id: GlyphId, queue: &mut EventQueue) -> bool {
        loop {
            let Some(Reverse(candidate)) = self.glyphs[id].merge_events.peek().copied() else {
                return false;
            };
            if !self.is_alive(candidate.partner) {
                self.glyphs[id].merge_events.pop();
                continue;
            }
            self.glyphs[id].merge_events.pop();
            queue.add(Event::merge(id, Some(candidate.partner), candidate.at));
            self.glyphs[candidate.partner].tracked_by.insert(id);
            return true;
        }
    }

    /// Promote `id`'s head out-of-cell event into `queue`. Stale-filtering
    /// for out-of-cell events happens at consume time, not here.
    pub fn pop_out_of_cell_into(&mut self, id: GlyphId, queue: &mut EventQueue) -> bool {
        let Some(Reverse(candidate)) = self.glyphs[id].out_of_cell_events.pop() else {
            return false;
        };
        queue.add(Event::out_of_cell(id, candidate.cell, candidate.side, candidate.at));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn pop_merge_discards_stale_heads() {
        let mut arena = arena_with(3);
        arena.get_mut(0).record_merge(MergeCandidate { at: 5.0, partner: 1 });
        arena.get_mut(0).record_merge(MergeCandidate { at: 10.0, partner: 2 });
        arena.get_mut(1).alive = Liveness::Dead;

        let mut q = EventQueue::new(crate::params::QueueBucketing::None);
        assert!(arena.pop_merge_into(0, &mut q));
        let ev = q.poll().unwrap();
        assert_eq!(ev.at, 10.0);
        assert!(arena.get(2).tracked_by.contains(&0));
    }

    #[test]
    fn pop_merge_returns_false_when_all_stale() {
        let mut arena = arena_with(2);
        arena.get_mut(0).record_merge(MergeCandidate { at: 5.0, partner: 1 });
        arena.get_mut(1).alive = Liveness::Dead;
        let mut q = EventQueue::new(crate::params::QueueBucketing::None);
        assert!(!arena.pop_merge_into(0, &mut q));
        assert!(q.is_empty());
    }

    #[test]
    fn absorb_moves_to_weighted_centroid_and_sums_weight() {
        let mut g = Glyph::new(Point::new(0.0, 0.0), 1);
        g.absorb(Point::new(10.0, 0.0), 1);
        assert_eq!(g.point, Point::new(5.0, 0.0));
        assert_eq!(g.weight, 2);

        g.absorb(Point::new(30.0, 0.0), 1);
        assert!((g.point.x - 20.0 / 3.0).abs() < 1e-9);
        assert_eq!(g.weight, 3);
    }

    #[test]
    fn absorb_clears_stale_cached_candidates() {
        let mut g = Glyph::new(Point::new(0.0, 0.0), 1);
        g.record_merge(MergeCandidate { at: 5.0, partner: 1 });
        g.record_out_of_cell(ExitCandidate { at: 5.0, cell: 0, side: Side::East });
        g.absorb(Point::new(10.0, 0.0), 1);
        assert!(g.merge_events.is_empty());
        assert!(g.out_of_cell_events.is_empty());
    }

    #[test]
    fn add_cell_then_remove_round_trips() {
        let mut g = Glyph::new(Point::new(0.0, 0.0), 1);
        g.add_cell(7);
        g.add_cell(9);
        assert_eq!(g.cells.len(), 2);
        g.remove_cell(7);
        assert_eq!(g.cells, vec![9]);
    }
}
