//! Geometry-related types.

use std::cmp::{max, min};
use std::ops::Range;

/// A rectangle in image coordinates.  Coordinates are signed, because
/// glyph boxes are routinely computed by offsetting other boxes, and the
/// intermediate values may fall outside the image.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Rect {
    left: i32,
    top: i32,
    width: i32,
    height: i32,
}

impl Rect {
    /// Create a rectangle by specifying the left, top, width and height
    /// values.  Negative sizes are clamped to zero.
    pub fn ltwh(l: i32, t: i32, w: i32, h: i32) -> Rect {
        Rect {
            left: l,
            top: t,
            width: max(w, 0),
            height: max(h, 0),
        }
    }

    /// Create a rectangle from left and top (inclusive) and right and
    /// bottom (exclusive) coordinates.
    pub fn ltrb(l: i32, t: i32, r: i32, b: i32) -> Rect {
        Rect::ltwh(l, t, r - l, b - t)
    }

    /// The left-most edge of the rectangle (inclusive).
    pub fn left(&self) -> i32 {
        self.left
    }

    /// The top-most edge of the rectangle (inclusive).
    pub fn top(&self) -> i32 {
        self.top
    }

    /// The right-most edge of the rectangle (exclusive).
    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    /// The bottom-most edge of the rectangle (exclusive).
    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }

    /// The width of the rectangle.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// The height of the rectangle.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Does this rectangle have area zero?
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Is the specified point in this rectangle?
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.left <= x && x < self.right() &&
            self.top <= y && y < self.bottom()
    }

    /// Return a rectangle including all the area included by this
    /// rectangle and another.  If either rectangle has zero area, it will
    /// be excluded.
    pub fn union(&self, other: &Rect) -> Rect {
        if other.is_empty() {
            self.to_owned()
        } else if self.is_empty() {
            other.to_owned()
        } else {
            Rect::ltrb(min(self.left, other.left),
                       min(self.top, other.top),
                       max(self.right(), other.right()),
                       max(self.bottom(), other.bottom()))
        }
    }

    /// Get a range from `left..right`.
    pub fn horizontal_range(&self) -> Range<i32> {
        self.left..self.right()
    }

    /// Do the columns covered by these rectangles touch or overlap?  Both
    /// right edges count as part of the rectangle here.
    pub fn touches_horizontally(&self, other: &Rect) -> bool {
        !(other.left > self.right() || other.right() < self.left)
    }

    /// Move this rectangle by the specified amount.
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::ltwh(self.left + dx, self.top + dy, self.width, self.height)
    }
}
