//! The quadtree-accelerated clustering engine: an event-driven main
//! loop over a global [`EventQueue`], backed by per-glyph merge/exit caches
//! ([`FirstMergeRecorder`], `Glyph::record_out_of_cell`) so that no full
//! pairwise scan is ever needed.

use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::{debug, trace};

use crate::dendrogram::Dendrogram;
use crate::error::Result;
use crate::event::{Event, EventKind, EventQueue};
use crate::geom::{Point, Rect, Side};
use crate::glyph::{ExitCandidate, Glyph, GlyphArena, GlyphId, Liveness};
use crate::grow::GrowFn;
use crate::params::{EngineParams, EPS};
use crate::quadtree::{CellId, Quadtree};
use crate::recorder::FirstMergeRecorder;

use super::{CancelToken, ClusterOutcome};

/// Cluster `points` (centre, weight) under `grow` using the adaptive
/// quadtree engine and the given tunables.
pub fn cluster_quadtree(
    points: &[(Point, u32)],
    grow: &dyn GrowFn,
    params: &EngineParams,
    cancel: &CancelToken,
) -> Result<ClusterOutcome> {
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

    let mut qt = Quadtree::new(
        bounding_rect(points).padded(1.0),
        params.max_glyphs_per_cell,
        params.min_cell_size,
    );
    let mut queue = EventQueue::new(params.queue_bucketing);

    for id in arena.ids() {
        qt.insert(id, &mut arena, 0.0, grow)?;
        let cells = arena.get(id).cells.clone();
        for cell in cells {
            record_exit_candidates(&qt, &mut arena, id, cell, grow, None);
        }
        arena.pop_out_of_cell_into(id, &mut queue);
        schedule_merges_for(&qt, &mut arena, &mut queue, id, grow, params);
    }

    let mut processed = 0usize;
    let mut discarded = 0usize;

    debug!(glyphs = points.len(), cells = qt.cell_count(), "engine starting");

    loop {
        if cancel.is_cancelled() {
            debug!(processed, discarded, "engine cancelled");
            return Ok(ClusterOutcome {
                dendrogram,
                events_processed: processed,
                events_discarded: discarded,
                cancelled: true,
            });
        }
        let Some(ev) = queue.poll() else { break };
        match ev.kind {
            EventKind::Merge { a, b: Some(b) } => {
                if !arena.is_alive(a) || !arena.is_alive(b) {
                    trace!(a, b, "discarding stale merge event");
                    discarded += 1;
                    continue;
                }
                processed += 1;
                trace!(a, b, at = ev.at, "dispatching merge event");
                process_merge_cascade(
                    ev.at, a, b, &mut queue, &mut arena, &mut qt, &mut dendrogram, grow, params,
                )?;
            }
            EventKind::Merge { b: None, .. } => {
                // Never produced by this engine; tie_key still handles it.
                discarded += 1;
            }
            EventKind::OutOfCell { glyph, cell, side } => {
                if !arena.is_alive(glyph) {
                    trace!(glyph, "discarding stale out-of-cell event");
                    discarded += 1;
                    continue;
                }
                processed += 1;
                trace!(glyph, cell, ?side, at = ev.at, "dispatching out-of-cell event");
                handle_out_of_cell(ev.at, glyph, cell, side, &mut queue, &mut arena, &mut qt, grow, params)?;
            }
        }
    }

    debug!(processed, discarded, nodes = dendrogram.len(), "engine converged");
    Ok(ClusterOutcome {
        dendrogram,
        events_processed: processed,
        events_discarded: discarded,
        cancelled: false,
    })
}

fn bounding_rect(points: &[(Point, u32)]) -> Rect {
    if points.is_empty() {
        return Rect::new(0.0, 0.0, 1.0, 1.0);
    }
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(p, _) in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    if min_x == max_x {
        max_x += 1.0;
    }
    if min_y == max_y {
        max_y += 1.0;
    }
    Rect::new(min_x, min_y, max_x, max_y)
}

/// The exit candidate for one specific side of `cell`.
fn exit_candidate_for_side(
    qt: &Quadtree,
    arena: &GlyphArena,
    glyph: GlyphId,
    cell: CellId,
    side: Side,
    grow: &dyn GrowFn,
) -> ExitCandidate {
    let geom = arena.get(glyph).geom();
    let rect = qt.cell(cell).rect;
    ExitCandidate { at: grow.exit_time(geom, rect, side), cell, side }
}

/// Record one `ExitCandidate` per non-root side of `cell` for `glyph` —
/// every side that has a neighbour, i.e. every side that isn't the outer
/// boundary of the whole spatial domain. `skip`, when given, additionally
/// excludes the side the glyph just entered through (re-emitting an exit
/// back the way it came is not useful information).
fn record_exit_candidates(
    qt: &Quadtree,
    arena: &mut GlyphArena,
    glyph: GlyphId,
    cell: CellId,
    grow: &dyn GrowFn,
    skip: Option<Side>,
) {
    for side in Side::ALL {
        if Some(side) == skip || qt.cell(cell).neighbours[side.index()].is_empty() {
            continue;
        }
        let candidate = exit_candidate_for_side(qt, arena, glyph, cell, side, grow);
        arena.get_mut(glyph).record_out_of_cell(candidate);
    }
}

fn schedule_merges_for(
    qt: &Quadtree,
    arena: &mut GlyphArena,
    queue: &mut EventQueue,
    glyph: GlyphId,
    grow: &dyn GrowFn,
    params: &EngineParams,
) {
    let mut candidates: Vec<GlyphId> = Vec::new();
    for &cell in &arena.get(glyph).cells {
        for c in qt.scan_overlaps(cell, glyph) {
            if !candidates.contains(&c) {
                candidates.push(c);
            }
        }
    }
    let capacity = if params.robust {
        usize::MAX
    } else {
        params.max_merges_to_record
    };
    let mut recorder = FirstMergeRecorder::start(glyph, capacity);
    if candidates.len() >= params.parallel_recorder_threshold {
        recorder.record_all_parallel(arena, &candidates, grow);
    } else {
        recorder.record_all(arena, candidates, grow);
    }
    recorder.finish(arena, queue, params.track);
}

/// Process every merge that fires at exactly `base_at`, folding chained
/// reactions (survivor absorbs a glyph that itself just absorbed another,
/// all at the same instant) into a single dendrogram node, without
/// round-tripping the global queue.
#[allow(clippy::too_many_arguments)]
fn process_merge_cascade(
    base_at: f64,
    a0: GlyphId,
    b0: GlyphId,
    queue: &mut EventQueue,
    arena: &mut GlyphArena,
    qt: &mut Quadtree,
    dendrogram: &mut Dendrogram,
    grow: &dyn GrowFn,
    params: &EngineParams,
) -> Result<()> {
    let mut local: BinaryHeap<std::cmp::Reverse<(GlyphId, GlyphId)>> = BinaryHeap::new();
    local.push(std::cmp::Reverse(pair_key(a0, b0)));

    while let Some(&next) = queue.peek() {
        if (next.at - base_at).abs() > EPS {
            break;
        }
        if let EventKind::Merge { a, b: Some(b) } = next.kind {
            queue.poll();
            local.push(std::cmp::Reverse(pair_key(a, b)));
        } else {
            break;
        }
    }

    let mut absorbed_into: HashMap<GlyphId, GlyphId> = HashMap::new();
    let mut node_of: HashMap<GlyphId, crate::dendrogram::NodeId> = HashMap::new();
    let mut joined_ancestors: Vec<CellId> = Vec::new();

    while let Some(std::cmp::Reverse((x, y))) = local.pop() {
        let x = resolve(&absorbed_into, x);
        let y = resolve(&absorbed_into, y);
        if x == y || !arena.is_alive(x) || !arena.is_alive(y) {
            continue;
        }
        let survivor = x.min(y);
        let dead = x.max(y);

        // Both parts leave the quadtree at their pre-merge positions; the
        // survivor is reinserted fresh at its new centroid once the whole
        // cascade has settled (spec's "insert merged into the quadtree"
        // happens once, at the end, not per chained fold).
        let dead_part = (arena.get(dead).point, arena.get(dead).weight);
        for cell in arena.get(survivor).cells.clone() {
            if qt.remove_glyph(survivor, cell, arena, base_at) {
                joined_ancestors.push(qt.get_non_orphan_ancestor(cell));
            }
        }
        for cell in arena.get(dead).cells.clone() {
            if qt.remove_glyph(dead, cell, arena, base_at) {
                joined_ancestors.push(qt.get_non_orphan_ancestor(cell));
            }
        }
        arena.get_mut(survivor).absorb(dead_part.0, dead_part.1);
        arena.get_mut(dead).alive = Liveness::Dead;
        absorbed_into.insert(dead, survivor);

        match node_of.get(&survivor) {
            Some(&existing) => {
                let dead_leaf = dendrogram.touch_leaf(dead, arena.get(dead).weight);
                dendrogram.also_created_from(existing, dead_leaf);
            }
            None => {
                let node = dendrogram.merge(survivor, &[dead], base_at, arena.get(survivor).weight);
                node_of.insert(survivor, node);
            }
        }

        let trackers: HashSet<GlyphId> = std::mem::take(&mut arena.get_mut(dead).tracked_by);
        for g in trackers {
            if !arena.is_alive(g) || g == survivor {
                continue;
            }
            let mut scratch = EventQueue::new(crate::params::QueueBucketing::None);
            if arena.pop_merge_into(g, &mut scratch) {
                let requeued = scratch.poll().expect("just pushed one event");
                if let EventKind::Merge { a, b: Some(b) } = requeued.kind {
                    if (requeued.at - base_at).abs() <= EPS {
                        local.push(std::cmp::Reverse(pair_key(a, b)));
                        continue;
                    }
                }
                queue.add(requeued);
            }
        }
    }

    if node_of.len() > 1 {
        debug!(base_at, survivors = node_of.len(), "cascade folded multiple merges at one instant");
    }

    for &survivor in node_of.keys() {
        // Reinsert the merged survivor at its new centroid and re-derive
        // its merge/exit candidates from scratch; `absorb` already
        // discarded the stale ones computed against its old geometry.
        qt.insert(survivor, arena, base_at, grow)?;
        for cell in arena.get(survivor).cells.clone() {
            record_exit_candidates(qt, arena, survivor, cell, grow, None);
        }
        arena.pop_out_of_cell_into(survivor, queue);
        schedule_merges_for(qt, arena, queue, survivor, grow, params);
    }

    joined_ancestors.sort_unstable();
    joined_ancestors.dedup();
    if !joined_ancestors.is_empty() {
        trace!(cells = joined_ancestors.len(), "quadtree join triggered by cascade");
    }
    for cell in joined_ancestors {
        let glyphs = qt.cell(cell).glyphs.clone();
        for g in glyphs {
            if arena.is_alive(g) {
                schedule_merges_for(qt, arena, queue, g, grow, params);
            }
        }
    }

    Ok(())
}

fn resolve(absorbed_into: &HashMap<GlyphId, GlyphId>, mut id: GlyphId) -> GlyphId {
    while let Some(&next) = absorbed_into.get(&id) {
        id = next;
    }
    id
}

fn pair_key(a: GlyphId, b: GlyphId) -> (GlyphId, GlyphId) {
    (a.min(b), a.max(b))
}

#[allow(clippy::too_many_arguments)]
fn handle_out_of_cell(
    at: f64,
    glyph: GlyphId,
    cell: CellId,
    side: Side,
    queue: &mut EventQueue,
    arena: &mut GlyphArena,
    qt: &mut Quadtree,
    grow: &dyn GrowFn,
    params: &EngineParams,
) -> Result<()> {
    let actual_cell = qt.get_non_orphan_ancestor(cell);
    if actual_cell != cell || !qt.cell(actual_cell).glyphs.contains(&glyph) {
        // The predicted exit targeted a cell that no longer exists as such
        // (joined away) or this glyph already left it by another route.
        // Schedule a fresh prediction against wherever it actually lives.
        arena.pop_out_of_cell_into(glyph, queue);
        return Ok(());
    }

    let exit_neighbours = qt.cell(cell).neighbours[side.index()].clone();
    let joined = qt.remove_glyph(glyph, cell, arena, at);
    let mut newly_entered: Vec<CellId> = Vec::new();
    for n in exit_neighbours {
        let n = qt.get_non_orphan_ancestor(n);
        if arena.get(glyph).cells.contains(&n) {
            continue;
        }
        let before: HashSet<CellId> = arena.get(glyph).cells.iter().copied().collect();
        qt.insert_into(n, glyph, arena, at, grow)?;
        for c in &arena.get(glyph).cells {
            if !before.contains(c) {
                newly_entered.push(*c);
            }
        }
    }

    // From the entered cell's perspective, the side facing back toward
    // where the glyph just came from; re-emitting an exit there would
    // just bounce it straight back.
    let entry_side = side.opposite();
    for &c in &newly_entered {
        for exit_side in Side::ALL {
            if exit_side == entry_side || qt.cell(c).neighbours[exit_side.index()].is_empty() {
                continue;
            }
            let candidate = exit_candidate_for_side(qt, arena, glyph, c, exit_side, grow);
            // Only emit if strictly later than the firing event's time, to
            // avoid a zero-duration re-exit loop at a shared boundary.
            if candidate.at > at + EPS {
                arena.get_mut(glyph).record_out_of_cell(candidate);
            }
        }
        schedule_merges_for(qt, arena, queue, glyph, grow, params);
    }
    arena.pop_out_of_cell_into(glyph, queue);

    if joined {
        let ancestor = qt.get_non_orphan_ancestor(cell);
        let glyphs = qt.cell(ancestor).glyphs.clone();
        for g in glyphs {
            if arena.is_alive(g) {
                schedule_merges_for(qt, arena, queue, g, grow, params);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grow::LinearSquares;

    fn params() -> EngineParams {
        EngineParams {
            max_glyphs_per_cell: 2,
            ..EngineParams::default()
        }
    }

    #[test]
    fn three_colinear_points_converge_to_one_root() {
        let points = vec![
            (Point::new(0.0, 0.0), 1),
            (Point::new(10.0, 0.0), 1),
            (Point::new(11.0, 0.0), 1),
        ];
        let outcome =
            cluster_quadtree(&points, &LinearSquares, &params(), &CancelToken::new()).unwrap();
        assert!(!outcome.cancelled);
        assert!(outcome.dendrogram.root().is_some());
    }

    #[test]
    fn matches_naive_dendrogram_root_time_for_small_grid() {
        let points = vec![
            (Point::new(0.0, 0.0), 1),
            (Point::new(5.0, 0.0), 1),
            (Point::new(0.0, 5.0), 1),
            (Point::new(5.0, 5.0), 1),
        ];
        let naive = super::super::naive::cluster_naive(&points, &LinearSquares, &CancelToken::new());
        let quad =
            cluster_quadtree(&points, &LinearSquares, &params(), &CancelToken::new()).unwrap();
        let naive_root_at = naive.dendrogram.node(naive.dendrogram.root().unwrap()).at;
        let quad_root_at = quad.dendrogram.node(quad.dendrogram.root().unwrap()).at;
        assert!((naive_root_at - quad_root_at).abs() < 1e-6);
    }

    #[test]
    fn cancellation_is_observed() {
        let points: Vec<_> = (0..20)
            .map(|i| (Point::new(f64::from(i) * 50.0, 0.0), 1))
            .collect();
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = cluster_quadtree(&points, &LinearSquares, &params(), &cancel).unwrap();
        assert!(outcome.cancelled);
    }
}
