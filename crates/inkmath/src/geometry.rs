//! Box geometry relations
//!
//! Every layout heuristic downstream is decided by the comparisons in this module.
//! They are free functions over two immutable [`BBox`] values; by convention the
//! first argument `a` is the reference box and `b` is the box being compared to it.
//!
//! Coordinates are integer pixels with `x2`/`y2` exclusive, so `width = x2 - x1`.
//! The y axis grows downwards: "top" means smaller y.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BBox {
    pub x1: i32, // left
    pub y1: i32, // top
    pub x2: i32, // right (exclusive)
    pub y2: i32, // bottom (exclusive)
}

impl BBox {
    /// Create a new bounding box
    #[inline]
    #[must_use = "returns a new BBox instance"]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create a bounding box from origin and size
    #[inline]
    #[must_use = "returns a new BBox instance"]
    pub const fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    #[inline]
    #[must_use]
    pub const fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    #[inline]
    #[must_use]
    pub fn x_center(&self) -> f64 {
        f64::from(self.x1) * 0.5 + f64::from(self.x2) * 0.5
    }

    #[inline]
    #[must_use]
    pub fn y_center(&self) -> f64 {
        f64::from(self.y1) * 0.5 + f64::from(self.y2) * 0.5
    }

    /// Start and end of the box along `axis`
    #[inline]
    #[must_use]
    pub const fn span(&self, axis: Axis) -> (i32, i32) {
        match axis {
            Axis::X => (self.x1, self.x2),
            Axis::Y => (self.y1, self.y2),
        }
    }

    /// Length of the box along `axis`
    #[inline]
    #[must_use]
    pub const fn length(&self, axis: Axis) -> i32 {
        let (start, end) = self.span(axis);
        end - start
    }

    /// Smallest rectangle covering both boxes
    #[inline]
    #[must_use = "returns the merged box; the inputs are not modified"]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// True if the box has positive width and height
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.x2 > self.x1 && self.y2 > self.y1
    }
}

/// Comparison axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// Edge direction for [`extends`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Top,
    Bottom,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Left, Self::Right, Self::Top, Self::Bottom];
}

/// Denominator used by [`overlap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OverlapBasis {
    /// Span covered by both boxes together
    #[default]
    Union,
    /// Length of the smaller box (how much of the smaller box is covered)
    Smaller,
}

/// Does `b` stick out of `a` on the given side?
#[inline]
#[must_use]
pub const fn extends(a: &BBox, b: &BBox, direction: Direction) -> bool {
    match direction {
        Direction::Left => b.x1 < a.x1,
        Direction::Right => b.x2 > a.x2,
        Direction::Top => b.y1 < a.y1,
        Direction::Bottom => b.y2 > a.y2,
    }
}

/// Does `b` stick out of `a` on any side?
#[inline]
#[must_use]
pub fn extends_outside(a: &BBox, b: &BBox) -> bool {
    Direction::ALL.iter().any(|&d| extends(a, b, d))
}

/// Overlap fraction of two boxes along one axis
///
/// Returns 1.0 when one box reaches past the other on both ends of the axis, or on
/// neither end (containment). A shared edge counts as reaching past on that end
/// exactly when the opposite end does, which keeps the result independent of
/// argument order. Otherwise the intersection length is divided by the union span
/// or by the smaller box's length. Disjoint boxes yield a value <= 0.
#[must_use]
pub fn overlap(a: &BBox, b: &BBox, axis: Axis, basis: OverlapBasis) -> f64 {
    let (a_start, a_end) = a.span(axis);
    let (b_start, b_end) = b.span(axis);

    let mut ext_low = b_start < a_start;
    let mut ext_high = b_end > a_end;
    if b_end == a_end {
        ext_high = ext_low;
    }
    if b_start == a_start {
        ext_low = ext_high;
    }

    if ext_low == ext_high {
        return 1.0;
    }

    let intersection = a_end.min(b_end) - a_start.max(b_start);
    let denominator = match basis {
        OverlapBasis::Union => a_end.max(b_end) - a_start.min(b_start),
        OverlapBasis::Smaller => a.length(axis).min(b.length(axis)),
    };
    if denominator <= 0 {
        return 0.0;
    }
    f64::from(intersection) / f64::from(denominator)
}

/// Is `b` fully inside `a`?
///
/// Edges may touch, but identical boxes are not considered nested.
#[inline]
#[must_use]
pub fn contains(a: &BBox, b: &BBox) -> bool {
    a != b && !extends_outside(a, b)
}

/// Do the two boxes touch or overlap at all? Touching edges count.
#[inline]
#[must_use]
pub const fn part_inside(a: &BBox, b: &BBox) -> bool {
    let apart_vertically = b.y2 < a.y1 || b.y1 > a.y2;
    let apart_horizontally = b.x2 < a.x1 || b.x1 > a.x2;
    !apart_vertically && !apart_horizontally
}

/// Is the longer of the two boxes at least `factor` times the shorter along `axis`?
#[inline]
#[must_use]
pub fn is_bigger(a: &BBox, b: &BBox, factor: f64, axis: Axis) -> bool {
    let la = f64::from(a.length(axis));
    let lb = f64::from(b.length(axis));
    la.max(lb) >= la.min(lb) * factor
}

/// Signed vertical center distance, `b` minus `a` (positive when `b` sits lower)
#[inline]
#[must_use]
pub fn vertical_distance(a: &BBox, b: &BBox) -> f64 {
    b.y_center() - a.y_center()
}

/// How far `b` overshoots `a` above or below, in units of `b`'s height
///
/// The larger of the downward and upward overshoot; negative when `b` stays within
/// `a` vertically.
#[must_use]
pub fn vertical_overshoot(a: &BBox, b: &BBox) -> f64 {
    let height = f64::from(b.height());
    if height <= 0.0 {
        return 0.0;
    }
    let down = f64::from(b.y2 - a.y2) / height;
    let up = f64::from(a.y1 - b.y1) / height;
    down.max(up)
}
