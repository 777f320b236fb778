//! Pure geometric primitives shared by the grow function and the quadtree.

use std::fmt;

/// A 2-D point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Point {
    /// Construct a point.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle, inclusive on both bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    /// Minimum X.
    pub min_x: f64,
    /// Minimum Y.
    pub min_y: f64,
    /// Maximum X.
    pub max_x: f64,
    /// Maximum Y.
    pub max_y: f64,
}

impl Rect {
    /// Construct a rectangle. Does not assert ordering of bounds.
    #[inline]
    #[must_use]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Width of the rectangle.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the rectangle.
    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Centre point.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// The rule used for point location: `(x, y)` belongs to this rect iff
    /// `min_x <= x <= max_x && min_y <= y <= max_y`.
    #[inline]
    #[must_use]
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Chebyshev distance from `p` to the nearest point of this (closed,
    /// finite) rectangle; `0.0` if `p` is inside.
    #[inline]
    #[must_use]
    pub fn chebyshev_distance_to_point(&self, p: Point) -> f64 {
        let dx = if p.x < self.min_x {
            self.min_x - p.x
        } else if p.x > self.max_x {
            p.x - self.max_x
        } else {
            0.0
        };
        let dy = if p.y < self.min_y {
            self.min_y - p.y
        } else if p.y > self.max_y {
            p.y - self.max_y
        } else {
            0.0
        };
        dx.max(dy)
    }

    /// Split into four exactly-halved children in NW, NE, SW, SE order.
    #[inline]
    #[must_use]
    pub fn split_quadrants(&self) -> [Rect; 4] {
        let c = self.center();
        [
            Rect::new(self.min_x, c.y, c.x, self.max_y), // NW
            Rect::new(c.x, c.y, self.max_x, self.max_y), // NE
            Rect::new(self.min_x, self.min_y, c.x, c.y), // SW
            Rect::new(c.x, self.min_y, self.max_x, c.y), // SE
        ]
    }

    /// Expand (or shrink) uniformly on all sides by `amount`.
    #[inline]
    #[must_use]
    pub fn padded(&self, amount: f64) -> Rect {
        Rect::new(
            self.min_x - amount,
            self.min_y - amount,
            self.max_x + amount,
            self.max_y + amount,
        )
    }

    /// The open interval of this rect's extent along the axis orthogonal to
    /// `side` (i.e. the span a neighbour on that side would need to overlap
    /// to be considered adjacent).
    #[inline]
    #[must_use]
    pub fn span_along(&self, side: Side) -> (f64, f64) {
        match side {
            Side::North | Side::South => (self.min_x, self.max_x),
            Side::East | Side::West => (self.min_y, self.max_y),
        }
    }

    /// The coordinate of the named boundary.
    #[inline]
    #[must_use]
    pub fn boundary(&self, side: Side) -> f64 {
        match side {
            Side::North => self.max_y,
            Side::South => self.min_y,
            Side::East => self.max_x,
            Side::West => self.min_x,
        }
    }
}

/// One of the four sides of an axis-aligned rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// +Y boundary.
    North,
    /// +X boundary.
    East,
    /// -Y boundary.
    South,
    /// -X boundary.
    West,
}

impl Side {
    /// All four sides, in a fixed order used for iteration and indexing.
    pub const ALL: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];

    /// Index into per-side arrays (`[Vec<CellId>; 4]`).
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Side::North => 0,
            Side::East => 1,
            Side::South => 2,
            Side::West => 3,
        }
    }

    /// The side a crossing neighbour sees this boundary from.
    #[inline]
    #[must_use]
    pub fn opposite(self) -> Side {
        match self {
            Side::North => Side::South,
            Side::South => Side::North,
            Side::East => Side::West,
            Side::West => Side::East,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::North => "N",
            Side::East => "E",
            Side::South => "S",
            Side::West => "W",
        };
        write!(f, "{s}")
    }
}

/// Which of the four children of a split cell, in storage order
/// (NW, NE, SW, SE — matches [`Rect::split_quadrants`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quadrant {
    /// North-west child.
    Nw = 0,
    /// North-east child.
    Ne = 1,
    /// South-west child.
    Sw = 2,
    /// South-east child.
    Se = 3,
}

impl Quadrant {
    /// All four quadrants in storage order.
    pub const ALL: [Quadrant; 4] = [Quadrant::Nw, Quadrant::Ne, Quadrant::Sw, Quadrant::Se];

    /// Which sides of the parent this quadrant touches (used to rebuild
    /// neighbour lists after a split).
    #[inline]
    #[must_use]
    pub fn outer_sides(self) -> &'static [Side] {
        match self {
            Quadrant::Nw => &[Side::North, Side::West],
            Quadrant::Ne => &[Side::North, Side::East],
            Quadrant::Sw => &[Side::South, Side::West],
            Quadrant::Se => &[Side::South, Side::East],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_inside_rect_has_zero_distance() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(r.chebyshev_distance_to_point(Point::new(5.0, 5.0)), 0.0);
        assert_eq!(r.chebyshev_distance_to_point(Point::new(0.0, 0.0)), 0.0);
    }

    #[test]
    fn distance_outside_is_chebyshev() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        // Directly to the right: pure dx.
        assert_eq!(r.chebyshev_distance_to_point(Point::new(15.0, 5.0)), 5.0);
        // Diagonal corner: max(dx, dy).
        assert_eq!(r.chebyshev_distance_to_point(Point::new(20.0, 13.0)), 10.0);
    }

    #[test]
    fn split_quadrants_partition_exactly() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let [nw, ne, sw, se] = r.split_quadrants();
        assert_eq!(nw, Rect::new(0.0, 5.0, 5.0, 10.0));
        assert_eq!(ne, Rect::new(5.0, 5.0, 10.0, 10.0));
        assert_eq!(sw, Rect::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(se, Rect::new(5.0, 0.0, 10.0, 5.0));
    }

    #[test]
    fn side_opposite_is_involutive() {
        for s in Side::ALL {
            assert_eq!(s.opposite().opposite(), s);
        }
    }
}
