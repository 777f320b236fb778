//! The adaptive point/region quadtree: the spatial index that tracks
//! which growing glyphs currently overlap which cells.
//!
//! Cells live in an arena (`Vec<Cell>`), addressed by [`CellId`]; a cell
//! owns its four children until [`Quadtree::remove_glyph`] triggers a join
//! and orphans them. All glyph/cell cross-references are plain indices,
//! never owned pointers.

use crate::error::{ClusterError, Result};
use crate::geom::{Quadrant, Rect, Side};
use crate::glyph::{GlyphArena, GlyphId};
use crate::grow::GrowFn;
use crate::params::EPS;

/// Arena index identifying a quadtree cell.
pub type CellId = usize;

/// An axis-aligned cell: either a leaf (holds glyphs and neighbour lists)
/// or an internal node (holds children).
#[derive(Debug)]
pub struct Cell {
    /// This cell's rectangle.
    pub rect: Rect,
    /// Four children in NW, NE, SW, SE order, or `None` for a leaf.
    pub children: Option<[CellId; 4]>,
    /// Parent cell, or `None` at the root.
    pub parent: Option<CellId>,
    /// Glyphs currently intersecting this cell. Meaningful at leaves only.
    pub glyphs: Vec<GlyphId>,
    /// Neighbouring leaf cells per side, indexed by [`Side::index`].
    /// Meaningful at leaves only.
    pub neighbours: [Vec<CellId>; 4],
    /// Set once this cell's parent has joined and forgotten it. An orphan
    /// cell's glyph/neighbour lists are empty and must not be used directly
    /// — see [`Quadtree::get_non_orphan_ancestor`].
    pub orphan: bool,
    /// Split depth from the root (root is 0). Used only to report
    /// `CapacityUnsatisfiable` diagnostics.
    pub depth: u32,
}

impl Cell {
    fn leaf(rect: Rect, parent: Option<CellId>, depth: u32) -> Self {
        Self {
            rect,
            children: None,
            parent,
            glyphs: Vec::new(),
            neighbours: Default::default(),
            orphan: false,
            depth,
        }
    }

    /// Whether this cell currently has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// An adaptive point/region quadtree over growing glyphs.
pub struct Quadtree {
    cells: Vec<Cell>,
    root: CellId,
    max_glyphs_per_cell: usize,
    min_cell_size: f64,
}

impl Quadtree {
    /// Construct a single root cell covering `bounds`.
    #[must_use]
    pub fn new(bounds: Rect, max_glyphs_per_cell: usize, min_cell_size: f64) -> Self {
        Self {
            cells: vec![Cell::leaf(bounds, None, 0)],
            root: 0,
            max_glyphs_per_cell,
            min_cell_size,
        }
    }

    /// The root cell id.
    #[must_use]
    pub fn root(&self) -> CellId {
        self.root
    }

    /// Borrow a cell.
    #[must_use]
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id]
    }

    /// Number of cells ever created (leaves, internal nodes, and orphans).
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Walk up from a (possibly orphan) cell until a non-orphan ancestor is
    /// found. Callers must use this whenever an out-of-cell event surfaces
    /// whose recorded cell has since become orphan.
    #[must_use]
    pub fn get_non_orphan_ancestor(&self, mut id: CellId) -> CellId {
        while self.cells[id].orphan {
            id = self.cells[id]
                .parent
                .expect("an orphan cell always has a parent (the cell that joined it)");
        }
        id
    }

    /// Point location: the unique leaf containing `(x, y)`, per the rule
    /// `min_x <= x <= max_x && min_y <= y <= max_y`, ties broken by
    /// quadrant index so every interior point is in exactly one leaf.
    #[must_use]
    pub fn find_leaf(&self, x: f64, y: f64) -> CellId {
        let p = crate::geom::Point::new(x, y);
        let mut id = self.root;
        loop {
            let Some(children) = self.cells[id].children else {
                return id;
            };
            let mut next = None;
            for (q, &child) in Quadrant::ALL.iter().zip(children.iter()) {
                let _ = q;
                if self.cells[child].rect.contains_point(p) {
                    next = Some(child);
                    break;
                }
            }
            id = next.expect("quadrant children fully partition the parent rect");
        }
    }

    /// Recursive descent collecting every leaf whose rectangle the glyph's
    /// region will overlap by time `t`.
    #[must_use]
    pub fn leaves_overlapping(
        &self,
        glyph: crate::grow::GlyphGeom,
        t: f64,
        grow: &dyn GrowFn,
    ) -> Vec<CellId> {
        let mut out = Vec::new();
        self.leaves_overlapping_rec(self.root, glyph, t, grow, &mut out);
        out
    }

    /// Candidate merge partners for a glyph currently in `leaf`: every
    /// other glyph in `leaf` itself plus every glyph in its neighbouring
    /// leaves, deduplicated and excluding `exclude`.
    #[must_use]
    pub fn scan_overlaps(&self, leaf: CellId, exclude: GlyphId) -> Vec<GlyphId> {
        let mut out: Vec<GlyphId> = Vec::new();
        let cell = &self.cells[leaf];
        let mut push_all = |glyphs: &[GlyphId], out: &mut Vec<GlyphId>| {
            for &g in glyphs {
                if g != exclude && !out.contains(&g) {
                    out.push(g);
                }
            }
        };
        push_all(&cell.glyphs, &mut out);
        for side in Side::ALL {
            for &n in &cell.neighbours[side.index()] {
                push_all(&self.cells[n].glyphs, &mut out);
            }
        }
        out
    }

    fn leaves_overlapping_rec(
        &self,
        id: CellId,
        glyph: crate::grow::GlyphGeom,
        t: f64,
        grow: &dyn GrowFn,
        out: &mut Vec<CellId>,
    ) {
        let cell = &self.cells[id];
        if grow.touch_time_rect(cell.rect, glyph) > t + EPS {
            return;
        }
        match cell.children {
            None => out.push(id),
            Some(children) => {
                for child in children {
                    self.leaves_overlapping_rec(child, glyph, t, grow, out);
                }
            }
        }
    }

    /// Insert `glyph` into every leaf its region overlaps at time `t`,
    /// splitting any leaf that overflows capacity. Returns the number of
    /// leaves the glyph was added to.
    pub fn insert(
        &mut self,
        glyph: GlyphId,
        arena: &mut GlyphArena,
        t: f64,
        grow: &dyn GrowFn,
    ) -> Result<usize> {
        self.insert_rec(self.root, glyph, arena, t, grow)
    }

    /// Same as [`Self::insert`], but descends from `start` instead of the
    /// root. Used when a glyph crosses into a known neighbour subtree and
    /// a full re-descent from the root would risk re-adding it to leaves
    /// it already occupies elsewhere in the tree.
    pub fn insert_into(
        &mut self,
        start: CellId,
        glyph: GlyphId,
        arena: &mut GlyphArena,
        t: f64,
        grow: &dyn GrowFn,
    ) -> Result<usize> {
        self.insert_rec(start, glyph, arena, t, grow)
    }

    fn insert_rec(
        &mut self,
        id: CellId,
        glyph: GlyphId,
        arena: &mut GlyphArena,
        t: f64,
        grow: &dyn GrowFn,
    ) -> Result<usize> {
        let geom = arena.get(glyph).geom();
        if grow.touch_time_rect(self.cells[id].rect, geom) > t + EPS {
            return Ok(0);
        }
        match self.cells[id].children {
            Some(children) => {
                let mut count = 0;
                for child in children {
                    count += self.insert_rec(child, glyph, arena, t, grow)?;
                }
                Ok(count)
            }
            None => {
                self.cells[id].glyphs.push(glyph);
                arena.get_mut(glyph).add_cell(id);
                if self.cells[id].glyphs.len() > self.max_glyphs_per_cell {
                    self.split(id, arena, t, grow)?;
                }
                Ok(1)
            }
        }
    }

    /// Replace leaf `id` with four exactly-halved children, redistributing
    /// its glyphs by re-insertion at time `t`, recursively splitting any
    /// child still over capacity. Refuses to split below `min_cell_size`.
    pub fn split(
        &mut self,
        id: CellId,
        arena: &mut GlyphArena,
        t: f64,
        grow: &dyn GrowFn,
    ) -> Result<()> {
        let cell_rect = self.cells[id].rect;
        let depth = self.cells[id].depth;
        let quads = cell_rect.split_quadrants();
        if quads[0].width() < self.min_cell_size || quads[0].height() < self.min_cell_size {
            return Err(ClusterError::CapacityUnsatisfiable {
                cell_rect,
                depth,
                at: t,
            });
        }

        let child_ids: [CellId; 4] = std::array::from_fn(|i| {
            self.cells.push(Cell::leaf(quads[i], Some(id), depth + 1));
            self.cells.len() - 1
        });
        tracing::trace!(cell = id, depth, glyphs = self.cells[id].glyphs.len(), "splitting cell");

        self.rewire_neighbours_after_split(id, child_ids);

        let glyphs = std::mem::take(&mut self.cells[id].glyphs);
        for g in &glyphs {
            arena.get_mut(*g).remove_cell(id);
        }
        self.cells[id].neighbours = Default::default();
        self.cells[id].children = Some(child_ids);

        for g in glyphs {
            for child in child_ids {
                self.insert_rec(child, g, arena, t, grow)?;
            }
        }

        for child in child_ids {
            if self.cells[child].glyphs.len() > self.max_glyphs_per_cell {
                self.split(child, arena, t, grow)?;
            }
        }
        Ok(())
    }

    /// Rewire neighbour bookkeeping after splitting `parent` into
    /// `children` (NW, NE, SW, SE order): parent's outer neighbours migrate
    /// to whichever children actually overlap their shared side, and the
    /// children become each other's neighbours across the new internal
    /// sides.
    fn rewire_neighbours_after_split(&mut self, parent: CellId, children: [CellId; 4]) {
        for side in Side::ALL {
            let old_neighbours = std::mem::take(&mut self.cells[parent].neighbours[side.index()]);
            for &child in &children {
                if !quadrant_touches_side(child_quadrant(children, child), side) {
                    continue;
                }
                let child_span = self.cells[child].rect.span_along(side);
                for &n in &old_neighbours {
                    let n_span = self.cells[n].rect.span_along(side);
                    if !open_intervals_overlap(child_span, n_span) {
                        continue;
                    }
                    self.cells[child].neighbours[side.index()].push(n);
                    let opp = side.opposite().index();
                    let nn = &mut self.cells[n].neighbours[opp];
                    if let Some(pos) = nn.iter().position(|&x| x == parent) {
                        nn[pos] = child;
                    } else if !nn.contains(&child) {
                        nn.push(child);
                    }
                }
            }
        }

        // Internal sides shared between siblings.
        let [nw, ne, sw, se] = children;
        link(self, nw, Side::East, ne);
        link(self, sw, Side::East, se);
        link(self, nw, Side::South, sw);
        link(self, ne, Side::South, se);

        fn link(qt: &mut Quadtree, a: CellId, side_from_a: Side, b: CellId) {
            qt.cells[a].neighbours[side_from_a.index()].push(b);
            qt.cells[b].neighbours[side_from_a.opposite().index()].push(a);
        }
    }

    /// Remove `glyph` from leaf `cell`, then ask the parent to try to join.
    /// Returns whether a join occurred (possibly cascading further up).
    pub fn remove_glyph(
        &mut self,
        glyph: GlyphId,
        cell: CellId,
        arena: &mut GlyphArena,
        t: f64,
    ) -> bool {
        if let Some(pos) = self.cells[cell].glyphs.iter().position(|&g| g == glyph) {
            self.cells[cell].glyphs.swap_remove(pos);
        }
        arena.get_mut(glyph).remove_cell(cell);

        match self.cells[cell].parent {
            Some(parent) => self.maybe_join(parent, arena, t),
            None => false,
        }
    }

    /// Join fires when all four children of `parent` are leaves and the
    /// union of their alive glyphs fits in one cell; cascades upward.
    fn maybe_join(&mut self, parent: CellId, arena: &mut GlyphArena, t: f64) -> bool {
        let Some(children) = self.cells[parent].children else {
            return false;
        };
        if children.iter().any(|&c| !self.cells[c].is_leaf()) {
            return false;
        }

        let mut alive_union: Vec<GlyphId> = Vec::new();
        for &c in &children {
            for &g in &self.cells[c].glyphs {
                if arena.is_alive(g) && !alive_union.contains(&g) {
                    alive_union.push(g);
                }
            }
        }
        if alive_union.len() > self.max_glyphs_per_cell {
            return false;
        }

        // Snapshot neighbours per side before clearing the children, then
        // inherit them into `parent` and fix up the neighbours' own
        // back-references to point at `parent` instead of the old child.
        let mut inherited: [Vec<CellId>; 4] = Default::default();
        for side in Side::ALL {
            for &c in &children {
                if !quadrant_touches_side(child_quadrant(children, c), side) {
                    continue;
                }
                for &n in &self.cells[c].neighbours[side.index()] {
                    if !inherited[side.index()].contains(&n) {
                        inherited[side.index()].push(n);
                    }
                }
            }
        }

        for &c in &children {
            let glyphs = std::mem::take(&mut self.cells[c].glyphs);
            for g in glyphs {
                arena.get_mut(g).remove_cell(c);
            }
            self.cells[c].neighbours = Default::default();
            self.cells[c].orphan = true;
        }

        for side in Side::ALL {
            let opp = side.opposite().index();
            for &n in &inherited[side.index()] {
                let nn = &mut self.cells[n].neighbours[opp];
                nn.retain(|x| !children.contains(x));
                if !nn.contains(&parent) {
                    nn.push(parent);
                }
            }
        }
        self.cells[parent].neighbours = inherited;

        self.cells[parent].children = None;
        self.cells[parent].glyphs = alive_union.clone();
        for g in &alive_union {
            arena.get_mut(*g).add_cell(parent);
        }

        tracing::trace!(cell = parent, glyphs = alive_union.len(), "joined four children");

        if let Some(p) = self.cells[parent].parent {
            self.maybe_join(p, arena, t);
        }
        true
    }
}

/// Which quadrant (by position in the 4-array) a given cell id occupies.
fn child_quadrant(children: [CellId; 4], id: CellId) -> Quadrant {
    let idx = children.iter().position(|&c| c == id).expect("id is one of the four children");
    Quadrant::ALL[idx]
}

fn quadrant_touches_side(q: Quadrant, side: Side) -> bool {
    q.outer_sides().contains(&side)
}

/// Two finite spans overlap in an open interval (strict containment on at
/// least one interior point), used for neighbour adjacency tests.
fn open_intervals_overlap(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0 < b.1 && b.0 < a.1
}
