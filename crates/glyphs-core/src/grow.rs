//! The grow function: pure geometry, injected into the rest of the
//! engine. All four operations must be pure, deterministic, and
//! monotone-nondecreasing in `t`.

use crate::geom::{Point, Rect, Side};

/// The minimal geometric state a grow function needs about a glyph: its
/// centre and its integer weight (weight >= 1).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphGeom {
    /// Centre of the glyph.
    pub point: Point,
    /// Integer weight, always >= 1.
    pub weight: u32,
}

impl GlyphGeom {
    /// Construct a glyph geometry.
    #[inline]
    #[must_use]
    pub const fn new(point: Point, weight: u32) -> Self {
        Self { point, weight }
    }
}

/// A pluggable function mapping `(glyph, time)` to a region, with a
/// reciprocal `touch_time` operation.
///
/// Implementors must be pure and side-effect free; the engine may call
/// these from multiple threads during parallel first-merge recording.
pub trait GrowFn: Send + Sync {
    /// Time at which `a` and `b` first touch. Returns `f64::NEG_INFINITY`
    /// for coincident points (reserved; callers treat this as `t = 0`).
    fn touch_time(&self, a: GlyphGeom, b: GlyphGeom) -> f64;

    /// Time at which `glyph`'s region first overlaps `rect`.
    fn touch_time_rect(&self, rect: Rect, glyph: GlyphGeom) -> f64;

    /// Time at which `glyph` reaches the infinite strip extending `side`
    /// of `cell` outward.
    fn exit_time(&self, glyph: GlyphGeom, cell: Rect, side: Side) -> f64;

    /// The region occupied by `glyph` at time `t`, as an axis-aligned
    /// bounding rectangle (exact for square/axis-aligned grow functions,
    /// a bound for others).
    fn size_at(&self, glyph: GlyphGeom, t: f64) -> Rect;
}

#[inline]
fn chebyshev_point_distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).abs().max((a.y - b.y).abs())
}

/// Radius at time `t` under the default linear grow rate: `r = t * weight`.
#[inline]
fn linear_radius(weight: u32, t: f64) -> f64 {
    t.max(0.0) * f64::from(weight)
}

#[inline]
fn exit_time_generic(glyph: GlyphGeom, cell: Rect, side: Side, radius_to_time: impl Fn(f64) -> f64) -> f64 {
    let d = match side {
        Side::North => cell.max_y - glyph.point.y,
        Side::South => glyph.point.y - cell.min_y,
        Side::East => cell.max_x - glyph.point.x,
        Side::West => glyph.point.x - cell.min_x,
    };
    radius_to_time(d.max(0.0))
}

/// Default grow function: a glyph occupies a chebyshev square (axis-aligned
/// square) whose half-width grows linearly with `t * weight`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearSquares;

impl GrowFn for LinearSquares {
    fn touch_time(&self, a: GlyphGeom, b: GlyphGeom) -> f64 {
        let d = chebyshev_point_distance(a.point, b.point);
        if d == 0.0 {
            return f64::NEG_INFINITY;
        }
        d / f64::from(a.weight + b.weight)
    }

    fn touch_time_rect(&self, rect: Rect, glyph: GlyphGeom) -> f64 {
        let d = rect.chebyshev_distance_to_point(glyph.point);
        if d == 0.0 {
            return 0.0;
        }
        d / f64::from(glyph.weight)
    }

    fn exit_time(&self, glyph: GlyphGeom, cell: Rect, side: Side) -> f64 {
        exit_time_generic(glyph, cell, side, |d| d / f64::from(glyph.weight))
    }

    fn size_at(&self, glyph: GlyphGeom, t: f64) -> Rect {
        let r = linear_radius(glyph.weight, t);
        Rect::new(
            glyph.point.x - r,
            glyph.point.y - r,
            glyph.point.x + r,
            glyph.point.y + r,
        )
    }
}

/// Variant where the square's half-width grows with `ln(1 + t) * weight`
/// rather than linearly. Drop-in replacement; does not affect the core.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogarithmicSquares;

impl LogarithmicSquares {
    #[inline]
    fn radius_to_time(weight: u32, r: f64) -> f64 {
        // r = ln(1 + t) * weight  =>  t = exp(r / weight) - 1
        (r / f64::from(weight)).exp() - 1.0
    }

    #[inline]
    fn radius(weight: u32, t: f64) -> f64 {
        (t.max(0.0) + 1.0).ln() * f64::from(weight)
    }
}

impl GrowFn for LogarithmicSquares {
    fn touch_time(&self, a: GlyphGeom, b: GlyphGeom) -> f64 {
        let d = chebyshev_point_distance(a.point, b.point);
        if d == 0.0 {
            return f64::NEG_INFINITY;
        }
        // r_a(t) + r_b(t) = d, radii grow at different weighted logarithmic
        // rates but share the combined weight the same way the linear
        // variant does: approximate via the combined-weight radius.
        Self::radius_to_time(a.weight + b.weight, d)
    }

    fn touch_time_rect(&self, rect: Rect, glyph: GlyphGeom) -> f64 {
        let d = rect.chebyshev_distance_to_point(glyph.point);
        if d == 0.0 {
            return 0.0;
        }
        Self::radius_to_time(glyph.weight, d)
    }

    fn exit_time(&self, glyph: GlyphGeom, cell: Rect, side: Side) -> f64 {
        exit_time_generic(glyph, cell, side, |d| Self::radius_to_time(glyph.weight, d))
    }

    fn size_at(&self, glyph: GlyphGeom, t: f64) -> Rect {
        let r = Self::radius(glyph.weight, t);
        Rect::new(
            glyph.point.x - r,
            glyph.point.y - r,
            glyph.point.x + r,
            glyph.point.y + r,
        )
    }
}

/// Variant where the square's *area* grows linearly with `t * weight`,
/// i.e. half-width `r = sqrt(t * weight)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AreaLinearSquares;

impl GrowFn for AreaLinearSquares {
    fn touch_time(&self, a: GlyphGeom, b: GlyphGeom) -> f64 {
        let d = chebyshev_point_distance(a.point, b.point);
        if d == 0.0 {
            return f64::NEG_INFINITY;
        }
        // r_a(t) + r_b(t) = d with r(t) = sqrt(t*w); solve numerically-free
        // by noting both radii share t, so (sqrt(w_a) + sqrt(w_b)) * sqrt(t) = d.
        let denom = f64::from(a.weight).sqrt() + f64::from(b.weight).sqrt();
        (d / denom).powi(2)
    }

    fn touch_time_rect(&self, rect: Rect, glyph: GlyphGeom) -> f64 {
        let d = rect.chebyshev_distance_to_point(glyph.point);
        if d == 0.0 {
            return 0.0;
        }
        (d * d) / f64::from(glyph.weight)
    }

    fn exit_time(&self, glyph: GlyphGeom, cell: Rect, side: Side) -> f64 {
        exit_time_generic(glyph, cell, side, |d| (d * d) / f64::from(glyph.weight))
    }

    fn size_at(&self, glyph: GlyphGeom, t: f64) -> Rect {
        let r = (t.max(0.0) * f64::from(glyph.weight)).sqrt();
        Rect::new(
            glyph.point.x - r,
            glyph.point.y - r,
            glyph.point.x + r,
            glyph.point.y + r,
        )
    }
}

/// Variant where a glyph grows as a Euclidean disk rather than a chebyshev
/// square. `size_at` still returns the disk's bounding square, since the
/// quadtree and event machinery only reason about axis-aligned rectangles.
#[derive(Clone, Copy, Debug, Default)]
pub struct CircularLinear;

#[inline]
fn euclidean_point_distance(a: Point, b: Point) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

#[inline]
fn euclidean_distance_to_rect(rect: Rect, p: Point) -> f64 {
    let dx = if p.x < rect.min_x {
        rect.min_x - p.x
    } else if p.x > rect.max_x {
        p.x - rect.max_x
    } else {
        0.0
    };
    let dy = if p.y < rect.min_y {
        rect.min_y - p.y
    } else if p.y > rect.max_y {
        p.y - rect.max_y
    } else {
        0.0
    };
    (dx * dx + dy * dy).sqrt()
}

impl GrowFn for CircularLinear {
    fn touch_time(&self, a: GlyphGeom, b: GlyphGeom) -> f64 {
        let d = euclidean_point_distance(a.point, b.point);
        if d == 0.0 {
            return f64::NEG_INFINITY;
        }
        d / f64::from(a.weight + b.weight)
    }

    fn touch_time_rect(&self, rect: Rect, glyph: GlyphGeom) -> f64 {
        let d = euclidean_distance_to_rect(rect, glyph.point);
        if d == 0.0 {
            return 0.0;
        }
        d / f64::from(glyph.weight)
    }

    fn exit_time(&self, glyph: GlyphGeom, cell: Rect, side: Side) -> f64 {
        exit_time_generic(glyph, cell, side, |d| d / f64::from(glyph.weight))
    }

    fn size_at(&self, glyph: GlyphGeom, t: f64) -> Rect {
        let r = linear_radius(glyph.weight, t);
        Rect::new(
            glyph.point.x - r,
            glyph.point.y - r,
            glyph.point.x + r,
            glyph.point.y + r,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(x: f64, y: f64, w: u32) -> GlyphGeom {
        GlyphGeom::new(Point::new(x, y), w)
    }

    #[test]
    fn two_equal_glyphs_touch_at_five() {
        let grow = LinearSquares;
        let t = grow.touch_time(g(0.0, 0.0, 1), g(10.0, 0.0, 1));
        assert!((t - 5.0).abs() < 1e-9);
    }

    #[test]
    fn coincident_points_are_negative_infinity() {
        let grow = LinearSquares;
        let t = grow.touch_time(g(1.0, 1.0, 3), g(1.0, 1.0, 2));
        assert_eq!(t, f64::NEG_INFINITY);
    }

    #[test]
    fn size_at_matches_radius_formula() {
        let grow = LinearSquares;
        let r = grow.size_at(g(0.0, 0.0, 2), 3.0);
        assert_eq!(r, Rect::new(-6.0, -6.0, 6.0, 6.0));
    }

    #[test]
    fn touch_time_rect_zero_when_already_overlapping() {
        let grow = LinearSquares;
        let rect = Rect::new(-1.0, -1.0, 1.0, 1.0);
        assert_eq!(grow.touch_time_rect(rect, g(0.0, 0.0, 5)), 0.0);
    }

    #[test]
    fn exit_time_is_perpendicular_distance_over_weight() {
        let grow = LinearSquares;
        let cell = Rect::new(0.0, 0.0, 10.0, 10.0);
        let t = grow.exit_time(g(2.0, 2.0, 2), cell, Side::East);
        assert!((t - 4.0).abs() < 1e-9); // (10-2)/2
    }

    #[test]
    fn all_variants_are_monotone_nondecreasing_in_t() {
        let gg = g(0.0, 0.0, 3);
        let variants: Vec<Box<dyn GrowFn>> = vec![
            Box::new(LinearSquares),
            Box::new(LogarithmicSquares),
            Box::new(AreaLinearSquares),
            Box::new(CircularLinear),
        ];
        for grow in variants {
            let mut prev = grow.size_at(gg, 0.0).max_x;
            for i in 1..20 {
                let t = f64::from(i) * 0.5;
                let cur = grow.size_at(gg, t).max_x;
                assert!(cur >= prev, "size_at must be nondecreasing in t");
                prev = cur;
            }
        }
    }
}
