//! The dendrogram (merge tree) the engine builds as it runs, plus a
//! time-ordered cursor for stepping through it after the fact.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::glyph::GlyphId;

/// Arena index identifying a dendrogram node.
pub type NodeId = usize;

/// One node in the merge tree: either a leaf (a glyph's birth, `at = 0`,
/// `created_from` empty) or a merge (the glyph that survived, the time of
/// the merge, and the prior nodes folded into it).
///
/// Immutable once built, except for [`Dendrogram::also_created_from`],
/// which appends an extra parent when a cascading merge folds more
/// than two branches together at the same timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DendroNode {
    /// The glyph this node represents (the surviving glyph, for merges).
    pub glyph: GlyphId,
    /// Simulation time this node was created.
    pub at: f64,
    /// Prior dendrogram nodes this node was created from.
    pub created_from: Vec<NodeId>,
    /// This node's total weight: the input glyph's own weight for a leaf,
    /// or the summed weight of everything folded into it so far for a
    /// merge. The root's weight equals the sum over every input glyph.
    pub weight: u32,
}

/// The merge tree, built incrementally as the engine processes events.
#[derive(Default)]
pub struct Dendrogram {
    nodes: Vec<DendroNode>,
    current_node_of: HashMap<GlyphId, NodeId>,
    root: Option<NodeId>,
}

impl Dendrogram {
    /// Construct an empty dendrogram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes (leaves and merges) created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no nodes have been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in creation order, for serialization.
    #[must_use]
    pub fn nodes(&self) -> &[DendroNode] {
        &self.nodes
    }

    /// Rebuild a finished (read-only) dendrogram from its serialized parts.
    /// The result cannot be extended further with [`Self::merge`].
    #[must_use]
    pub fn from_parts(nodes: Vec<DendroNode>, root: Option<NodeId>) -> Self {
        Self {
            nodes,
            current_node_of: HashMap::new(),
            root,
        }
    }

    /// Borrow a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &DendroNode {
        &self.nodes[id]
    }

    /// The root node, once clustering has converged to a single glyph.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Ensure `glyph` has a leaf node (created at `t = 0` the first time
    /// it's touched, with `weight`) and return its current node id.
    /// `weight` is only consulted on first touch; later calls for a glyph
    /// that already has a node (survivor/consumed lookups from
    /// [`Self::merge`]) just return the existing id.
    pub fn touch_leaf(&mut self, glyph: GlyphId, weight: u32) -> NodeId {
        if let Some(&id) = self.current_node_of.get(&glyph) {
            return id;
        }
        let id = self.push(DendroNode {
            glyph,
            at: 0.0,
            created_from: Vec::new(),
            weight,
        });
        self.current_node_of.insert(glyph, id);
        id
    }

    /// Record that `survivor` absorbed `consumed` at time `at`, creating a
    /// new node of total `weight` (the weighted-centroid merge's summed
    /// weight) whose `created_from` is the current node of `survivor`
    /// followed by the current nodes of each consumed glyph. Becomes the
    /// new current node for `survivor`; `consumed` glyphs are retired.
    pub fn merge(&mut self, survivor: GlyphId, consumed: &[GlyphId], at: f64, weight: u32) -> NodeId {
        let mut created_from = vec![self.touch_leaf(survivor, weight)];
        for &c in consumed {
            created_from.push(self.touch_leaf(c, weight));
            self.current_node_of.remove(&c);
        }
        let id = self.push(DendroNode {
            glyph: survivor,
            at,
            created_from,
            weight,
        });
        self.current_node_of.insert(survivor, id);
        if self.current_node_of.len() == 1 {
            self.root = Some(id);
        }
        id
    }

    /// Append an additional parent to an existing merge node's
    /// `created_from` list, used when a nested-merge cascade folds
    /// another branch into a node already created at the same timestamp.
    pub fn also_created_from(&mut self, node: NodeId, extra: NodeId) {
        if !self.nodes[node].created_from.contains(&extra) {
            self.nodes[node].created_from.push(extra);
        }
    }

    /// Preorder DFS over the tree rooted at `id`.
    pub fn dfs(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.dfs_rec(id, &mut out);
        out
    }

    fn dfs_rec(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for &child in &self.nodes[id].created_from {
            self.dfs_rec(child, out);
        }
    }

    /// A cursor over every merge node (leaves excluded), sorted ascending
    /// by `at`, for stepping through the clustering history in time order.
    #[must_use]
    pub fn cursor(&self) -> Cursor<'_> {
        let mut order: Vec<NodeId> = (0..self.nodes.len())
            .filter(|&id| !self.nodes[id].created_from.is_empty())
            .collect();
        order.sort_by(|&a, &b| {
            self.nodes[a]
                .at
                .partial_cmp(&self.nodes[b].at)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        Cursor {
            dendrogram: self,
            order,
            position: 0,
        }
    }

    fn push(&mut self, node: DendroNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }
}

/// Steps through a dendrogram's merge nodes in time order, one at a time.
pub struct Cursor<'a> {
    dendrogram: &'a Dendrogram,
    order: Vec<NodeId>,
    position: usize,
}

impl<'a> Cursor<'a> {
    /// The merge node currently under the cursor, if any.
    #[must_use]
    pub fn current(&self) -> Option<&'a DendroNode> {
        self.order.get(self.position).map(|&id| self.dendrogram.node(id))
    }

    /// Move forward one merge, returning the new current node.
    pub fn advance(&mut self) -> Option<&'a DendroNode> {
        if self.position + 1 < self.order.len() {
            self.position += 1;
        }
        self.current()
    }

    /// Move backward one merge, returning the new current node.
    pub fn retreat(&mut self) -> Option<&'a DendroNode> {
        self.position = self.position.saturating_sub(1);
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_merge_chain_builds_a_single_root() {
        let mut d = Dendrogram::new();
        d.touch_leaf(0, 1);
        d.touch_leaf(1, 1);
        d.touch_leaf(2, 1);
        d.merge(0, &[1], 5.0, 2);
        let root = d.merge(0, &[2], 8.0, 3);
        assert_eq!(d.root(), Some(root));
        assert_eq!(d.node(root).glyph, 0);
        assert_eq!(d.node(root).at, 8.0);
        assert_eq!(d.node(root).weight, 3);
    }

    #[test]
    fn dfs_visits_every_ancestor() {
        let mut d = Dendrogram::new();
        d.touch_leaf(0, 1);
        d.touch_leaf(1, 1);
        d.touch_leaf(2, 1);
        d.merge(0, &[1], 1.0, 2);
        let root = d.merge(0, &[2], 2.0, 3);
        let visited = d.dfs(root);
        assert_eq!(visited.len(), 5); // root + two merge-child leaves/nodes + two original leaves
    }

    #[test]
    fn also_created_from_appends_without_duplicating() {
        let mut d = Dendrogram::new();
        let leaf_a = d.touch_leaf(0, 1);
        let leaf_b = d.touch_leaf(1, 1);
        let node = d.merge(0, &[1], 1.0, 2);
        d.also_created_from(node, leaf_a);
        d.also_created_from(node, leaf_b);
        assert_eq!(d.node(node).created_from.len(), 2);
    }

    #[test]
    fn cursor_steps_forward_and_back_in_time_order() {
        let mut d = Dendrogram::new();
        d.touch_leaf(0, 1);
        d.touch_leaf(1, 1);
        d.touch_leaf(2, 1);
        d.merge(0, &[1], 5.0, 2);
        d.merge(0, &[2], 2.0, 3); // out of chronological insertion order on purpose
        let mut cur = d.cursor();
        let first = cur.current().unwrap().at;
        let second = cur.advance().unwrap().at;
        assert!(first <= second);
        assert_eq!(cur.retreat().unwrap().at, first);
    }
}
