//! Synthetic point generators used by the CLI `simulate` subcommand.
//! Both are deterministic for a given seed.

use rand::{rngs::StdRng, Rng as _, SeedableRng};

use glyphs_core::geom::Point;

use crate::points::WeightedPoint;

/// Uniform random points in `[0, width) x [0, height)` with weight drawn
/// uniformly from `[min_weight, max_weight]`.
#[must_use]
pub fn generate_uniform(
    count: usize,
    width: f64,
    height: f64,
    min_weight: u32,
    max_weight: u32,
    seed: u64,
) -> Vec<WeightedPoint> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let x = rng.random_range(0.0..width);
            let y = rng.random_range(0.0..height);
            let weight = rng.random_range(min_weight..=max_weight);
            (Point::new(x, y), weight)
        })
        .collect()
}

/// Points arranged in `clusters` tight Gaussian-ish blobs (via a crude
/// Box-Muller-free sum-of-uniforms approximation) scattered across
/// `[0, width) x [0, height)`, for exercising merge cascades.
#[must_use]
pub fn generate_clustered(
    clusters: usize,
    points_per_cluster: usize,
    width: f64,
    height: f64,
    spread: f64,
    seed: u64,
) -> Vec<WeightedPoint> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(clusters * points_per_cluster);
    for _ in 0..clusters {
        let cx = rng.random_range(0.0..width);
        let cy = rng.random_range(0.0..height);
        for _ in 0..points_per_cluster {
            let jitter_x: f64 = (0..4).map(|_| rng.random_range(-spread..spread)).sum::<f64>() / 4.0;
            let jitter_y: f64 = (0..4).map(|_| rng.random_range(-spread..spread)).sum::<f64>() / 4.0;
            out.push((Point::new(cx + jitter_x, cy + jitter_y), 1));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_generator_is_deterministic_for_a_seed() {
        let a = generate_uniform(20, 100.0, 100.0, 1, 3, 7);
        let b = generate_uniform(20, 100.0, 100.0, 1, 3, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn uniform_generator_respects_bounds() {
        let pts = generate_uniform(50, 10.0, 20.0, 2, 2, 1);
        for (p, w) in pts {
            assert!((0.0..10.0).contains(&p.x));
            assert!((0.0..20.0).contains(&p.y));
            assert_eq!(w, 2);
        }
    }

    #[test]
    fn clustered_generator_produces_expected_count() {
        let pts = generate_clustered(3, 5, 100.0, 100.0, 2.0, 1);
        assert_eq!(pts.len(), 15);
    }
}
