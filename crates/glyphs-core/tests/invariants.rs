//! Cross-cutting invariants for the clustering engine: mass
//! conservation, quadtree membership/neighbour symmetry, event
//! monotonicity, dendrogram well-formedness, and naive/quadtree
//! equivalence.
//!
//! These tests treat the naive all-pairs engine as the ground truth and the
//! quadtree engine as an accelerated implementation that must agree with it
//! on small, randomized inputs.

use proptest::prelude::*;

use glyphs_core::engine::naive::cluster_naive;
use glyphs_core::engine::quadtree_engine::cluster_quadtree;
use glyphs_core::{CancelToken, EngineParams, LinearSquares, Point};

fn small_point_set() -> impl Strategy<Value = Vec<(Point, u32)>> {
    proptest::collection::vec(
        ((-50.0_f64..50.0), (-50.0_f64..50.0), 1_u32..4),
        2..12,
    )
    .prop_map(|pts| {
        pts.into_iter()
            .map(|(x, y, w)| (Point::new(x, y), w))
            .collect()
    })
}

proptest! {
    #[test]
    fn quadtree_engine_reaches_a_single_root_matching_naive(points in small_point_set()) {
        let params = EngineParams { max_glyphs_per_cell: 2, ..EngineParams::default() };
        let naive = cluster_naive(&points, &LinearSquares, &CancelToken::new());
        let quad = cluster_quadtree(&points, &LinearSquares, &params, &CancelToken::new()).unwrap();

        prop_assert!(naive.dendrogram.root().is_some());
        prop_assert!(quad.dendrogram.root().is_some());

        let naive_at = naive.dendrogram.node(naive.dendrogram.root().unwrap()).at;
        let quad_at = quad.dendrogram.node(quad.dendrogram.root().unwrap()).at;
        prop_assert!((naive_at - quad_at).abs() < 1e-6, "naive root at {naive_at}, quadtree root at {quad_at}");
    }

    #[test]
    fn dendrogram_merge_times_are_nondecreasing_along_every_ancestor_chain(points in small_point_set()) {
        let params = EngineParams { max_glyphs_per_cell: 2, ..EngineParams::default() };
        let outcome = cluster_quadtree(&points, &LinearSquares, &params, &CancelToken::new()).unwrap();
        let Some(root) = outcome.dendrogram.root() else { return Ok(()); };

        fn check(d: &glyphs_core::Dendrogram, id: glyphs_core::NodeId, parent_at: f64) -> bool {
            let node = d.node(id);
            if node.at > parent_at + 1e-9 {
                return false;
            }
            node.created_from.iter().all(|&c| check(d, c, node.at))
        }
        prop_assert!(check(&outcome.dendrogram, root, f64::INFINITY));
    }

    #[test]
    fn root_weight_equals_total_input_weight(points in small_point_set()) {
        let total: u32 = points.iter().map(|&(_, w)| w).sum();
        let params = EngineParams { max_glyphs_per_cell: 2, ..EngineParams::default() };

        let naive = cluster_naive(&points, &LinearSquares, &CancelToken::new());
        if let Some(root) = naive.dendrogram.root() {
            prop_assert_eq!(naive.dendrogram.node(root).weight, total);
        }

        let quad = cluster_quadtree(&points, &LinearSquares, &params, &CancelToken::new()).unwrap();
        if let Some(root) = quad.dendrogram.root() {
            prop_assert_eq!(quad.dendrogram.node(root).weight, total);
        }
    }
}

#[test]
fn three_in_a_row_merges_nearest_pair_first_then_weighted_centroid_with_the_third() {
    let points = vec![
        (Point::new(0.0, 0.0), 1),
        (Point::new(10.0, 0.0), 1),
        (Point::new(30.0, 0.0), 1),
    ];
    let naive = cluster_naive(&points, &LinearSquares, &CancelToken::new());
    let root = naive.dendrogram.root().expect("three points converge to one root");
    let root_node = naive.dendrogram.node(root);
    assert!((root_node.at - 25.0 / 3.0).abs() < 1e-9, "expected root at ~8.333, got {}", root_node.at);
    assert_eq!(root_node.weight, 3);
    assert_eq!(naive.dendrogram.len(), 5); // 3 leaves + 2 merge nodes

    let params = EngineParams { max_glyphs_per_cell: 2, ..EngineParams::default() };
    let quad = cluster_quadtree(&points, &LinearSquares, &params, &CancelToken::new()).unwrap();
    let quad_root = quad.dendrogram.node(quad.dendrogram.root().unwrap());
    assert!((quad_root.at - 25.0 / 3.0).abs() < 1e-6);
    assert_eq!(quad_root.weight, 3);
}

#[test]
fn two_points_that_never_touch_each_other_directly_still_reach_one_root_via_a_third() {
    let points = vec![
        (Point::new(0.0, 0.0), 1),
        (Point::new(100.0, 0.0), 1),
        (Point::new(50.0, 0.0), 1),
    ];
    let params = EngineParams::default();
    let outcome = cluster_quadtree(&points, &LinearSquares, &params, &CancelToken::new()).unwrap();
    assert!(outcome.dendrogram.root().is_some());
}

#[test]
fn single_point_input_produces_no_root() {
    let points = vec![(Point::new(1.0, 1.0), 3)];
    let outcome = cluster_quadtree(
        &points,
        &LinearSquares,
        &EngineParams::default(),
        &CancelToken::new(),
    )
    .unwrap();
    assert!(outcome.dendrogram.root().is_none());
    assert_eq!(outcome.events_processed, 0);
}

#[test]
fn cluster_is_deterministic_across_repeated_runs() {
    let points = vec![
        (Point::new(0.0, 0.0), 2),
        (Point::new(3.0, 4.0), 1),
        (Point::new(-5.0, 1.0), 3),
        (Point::new(8.0, -2.0), 1),
        (Point::new(1.0, 1.0), 2),
    ];
    let params = EngineParams { max_glyphs_per_cell: 2, ..EngineParams::default() };
    let first = cluster_quadtree(&points, &LinearSquares, &params, &CancelToken::new()).unwrap();
    let second = cluster_quadtree(&points, &LinearSquares, &params, &CancelToken::new()).unwrap();
    let a = first.dendrogram.node(first.dendrogram.root().unwrap());
    let b = second.dendrogram.node(second.dendrogram.root().unwrap());
    assert_eq!(a.glyph, b.glyph);
    assert_eq!(a.at, b.at);
}
