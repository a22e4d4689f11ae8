//! Finding the gaps between glyphs on a line of text.
//!
//! We first look for columns which are empty over the whole line.  Glyphs
//! like "Ty" or "AV" overlap horizontally, so we also look for gaps over
//! the top or bottom part of the line only, and then try to complete each
//! partial gap by following it around the neighbouring glyph, or along a
//! diagonal.

use std::collections::BTreeMap;

use crate::config::OcrOptions;
use crate::geom::Rect;
use crate::lines::{anchored_column_has_ink, Anchor, TextLine};
use crate::pixmap::Pixmap;

/// Partial gaps further apart than this are never merged.
const MERGE_DISTANCE: i32 = 10;

/// Full gaps closer together than this are the same gap.
const MIN_GAP_DISTANCE: i32 = 4;

/// Diagonal gaps are tested at slopes up to (but excluding) this.
const MAX_SLOPE: f64 = 0.5;
const SLOPE_STEP: f64 = 0.1;

/// How far a diagonal gap's slanted part overlaps the partial gap it
/// continues.
const DIAGONAL_OVERLAP: i32 = 2;

/// The corner of a glyph cut off by a diagonal gap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    /// The gap leans left above its straight part.
    TopLeft,
    /// The gap leans right above its straight part.
    TopRight,
    /// The gap leans left below its straight part.
    BottomLeft,
    /// The gap leans right below its straight part.
    BottomRight,
}

impl Corner {
    /// Does the slanted part of the gap cover the top of the line?
    pub fn is_top(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }

    /// Is the slanted part of the gap to the right of its straight part?
    pub fn is_right(self) -> bool {
        matches!(self, Corner::TopRight | Corner::BottomRight)
    }
}

/// A gap whose upper or lower part runs diagonally.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Diagonal {
    /// Which way the diagonal part runs.
    pub corner: Corner,
    /// The row, relative to the top of the line, where the diagonal part
    /// starts.
    pub slope_start: i32,
    /// Columns per row.
    pub slope: f64,
}

/// The shape of a gap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpaceKind {
    /// An ordinary run of empty columns.
    Straight,
    /// A zero-width gap with a slanted part.
    Diagonal(Diagonal),
}

/// A gap between two glyphs.
#[derive(Clone, Debug, PartialEq)]
pub struct SpaceRegion {
    /// The empty area.  Diagonal gaps have zero width.
    pub rect: Rect,
    /// Is this gap only known to cover part of the line?
    pub partial: bool,
    /// The shape of the gap.
    pub kind: SpaceKind,
}

impl SpaceRegion {
    fn straight(rect: Rect, partial: bool) -> SpaceRegion {
        SpaceRegion { rect, partial, kind: SpaceKind::Straight }
    }

    /// The diagonal part of this gap, if any.
    pub fn diagonal(&self) -> Option<&Diagonal> {
        match &self.kind {
            SpaceKind::Diagonal(d) => Some(d),
            SpaceKind::Straight => None,
        }
    }

    /// The sort key for this gap.  Gaps are processed left to right.
    fn key(&self) -> i32 {
        self.rect.left() * 1000 + self.rect.top()
    }
}

/// Gaps on one line, keyed by position.
pub type SpaceMap = BTreeMap<i32, SpaceRegion>;

fn insert_space(spaces: &mut SpaceMap, key: i32, space: SpaceRegion) {
    if let Some(existing) = spaces.get(&key) {
        warn!("space {:?} collides with {:?}, dropping it", space.rect, existing.rect);
    } else {
        spaces.insert(key, space);
    }
}

/// Find runs of empty columns between rows `y_start` and `y_end`.  Partial
/// gaps overlapping a gap we already know about are ignored.
pub fn find_spaces(img: &Pixmap<u8>,
                   y_start: i32,
                   y_end: i32,
                   partial: bool,
                   tolerance: i32,
                   spaces: &mut SpaceMap) {
    let width = img.w();
    let mut in_glyph = false;
    let mut x_start = 0;
    for x in 0..width {
        let has_ink = img.column_has_ink(x, y_start, y_end);
        if in_glyph && !has_ink {
            x_start = x;
            in_glyph = false;
        }
        if !in_glyph && (has_ink || x == width - 1) {
            if x - x_start >= tolerance || x < tolerance || x >= width - tolerance {
                let x_end = if x == width - 1 { x + 1 } else { x };
                let rect = Rect::ltrb(x_start, y_start, x_end, y_end);
                let overlaps = partial && spaces.values()
                    .any(|s| rect.touches_horizontally(&s.rect));
                if !overlaps {
                    let space = SpaceRegion::straight(rect, partial);
                    insert_space(spaces, space.key(), space);
                }
            }
            in_glyph = true;
        }
    }
}

/// Grow a partial gap touching the top or bottom of the line until it
/// reaches ink.  A gap that now covers the whole line is no longer partial.
pub fn extend_partial_space(img: &Pixmap<u8>, y_start: i32, y_end: i32, space: &mut SpaceRegion) {
    if !space.partial {
        return;
    }
    let r = space.rect;
    let (left, right) = (r.left(), r.right());
    let mut rect = r;
    if rect.top() == y_start {
        let mut y = rect.bottom();
        while y < y_end && !img.row_has_ink(y, left, right) {
            y += 1;
        }
        rect = Rect::ltrb(left, rect.top(), right, y);
    }
    if rect.bottom() == y_end {
        let mut y = rect.top();
        while y >= y_start && !img.row_has_ink(y, left, right) {
            y -= 1;
        }
        rect = Rect::ltrb(left, y, right, rect.bottom());
    }
    space.rect = rect;
    if rect.top() <= y_start && rect.bottom() >= y_end - 1 {
        space.partial = false;
    }
}

/// Replace neighbouring partial gaps on the same side of the line with a
/// single gap, if one fits between them.
pub fn merge_spaces(img: &Pixmap<u8>,
                    y_start: i32,
                    y_end: i32,
                    height_slack: i32,
                    spaces: &mut SpaceMap) {
    let mut removed = vec![];
    let mut added = vec![];
    let entries: Vec<(&i32, &SpaceRegion)> = spaces.iter().collect();
    for pair in entries.windows(2) {
        let ((&last_key, last), (&key, space)) = (pair[0], pair[1]);
        let (a, b) = (last.rect, space.rect);
        if !(last.partial && space.partial) || b.left() - a.right() >= MERGE_DISTANCE {
            continue;
        }
        if a.top() != b.top() && a.bottom() != b.bottom() {
            continue;
        }
        let mut merged = SpaceRegion::straight(
            Rect::ltwh(a.left(), a.bottom() - 1, b.right() - a.left(), 1), true);
        extend_partial_space(img, y_start, y_end, &mut merged);
        let height = merged.rect.height();
        if a.height() - height < height_slack && b.height() - height < height_slack {
            trace!("merging partial spaces {:?} and {:?}", a, b);
            removed.push(last_key);
            removed.push(key);
            added.push(merged);
        }
    }
    for key in removed {
        spaces.remove(&key);
    }
    for space in added {
        insert_space(spaces, space.key(), space);
    }
}

/// The slopes we try for diagonal gaps, in the direction of `sign`.
fn candidate_slopes(sign: f64) -> Vec<f64> {
    let mut slopes = vec![];
    let mut k = SLOPE_STEP;
    while k < MAX_SLOPE {
        slopes.push(sign * k);
        k += SLOPE_STEP;
    }
    slopes
}

/// One way a partial gap might continue diagonally.
struct DiagonalCandidate {
    corner: Corner,
    /// The first column tested, and the direction we move in.
    first_column: i32,
    step: i32,
    /// The column where the new zero-width gap goes.
    column: i32,
    sign: f64,
}

/// Look for diagonal continuations of each partial gap, and add a
/// zero-width gap for each one we find.
pub fn find_diagonal_breaks(img: &Pixmap<u8>,
                            y_start: i32,
                            y_end: i32,
                            tolerance: i32,
                            spaces: &mut SpaceMap) {
    let mut found = vec![];
    for space in spaces.values().filter(|s| s.partial) {
        let r = space.rect;
        let (anchor, y1, y2, slope_start, tries) = if r.bottom() == y_end {
            (Anchor::Bottom, y_start, r.top() + DIAGONAL_OVERLAP,
             r.top() - y_start + DIAGONAL_OVERLAP,
             [DiagonalCandidate { corner: Corner::TopRight, first_column: r.right(), step: -1,
                              column: r.right(), sign: 1.0 },
              DiagonalCandidate { corner: Corner::TopLeft, first_column: r.left() - 1, step: 1,
                              column: r.left(), sign: -1.0 }])
        } else if r.top() == y_start {
            (Anchor::Top, r.bottom() - DIAGONAL_OVERLAP, y_end,
             r.bottom() - y_start - DIAGONAL_OVERLAP,
             [DiagonalCandidate { corner: Corner::BottomRight, first_column: r.right(), step: -1,
                              column: r.right(), sign: -1.0 },
              DiagonalCandidate { corner: Corner::BottomLeft, first_column: r.left() - 1, step: 1,
                              column: r.left(), sign: 1.0 }])
        } else {
            continue;
        };

        let hits = tries.iter().filter_map(|attempt| {
            candidate_slopes(attempt.sign).into_iter().find(|&slope| {
                (0..tolerance).all(|i| {
                    let x = attempt.first_column + i * attempt.step;
                    !anchored_column_has_ink(img, x, slope, y1, y2, anchor)
                })
            }).map(|slope| (attempt, slope))
        });
        // A gap hanging from the top of the line may fork both ways.
        let limit = match anchor {
            Anchor::Bottom => 1,
            Anchor::Top => tries.len(),
        };
        for (attempt, slope) in hits.take(limit) {
            trace!("diagonal {:?} gap at {} with slope {}", attempt.corner, attempt.column, slope);
            found.push(SpaceRegion {
                rect: Rect::ltwh(attempt.column, y_start, 0, y_end - y_start - 1),
                partial: false,
                kind: SpaceKind::Diagonal(Diagonal {
                    corner: attempt.corner,
                    slope_start,
                    slope,
                }),
            });
        }
    }
    for space in found {
        insert_space(spaces, space.key() + 1, space);
    }
}

/// Drop gaps that are still partial, and gaps too close to the previous
/// one.
pub fn cleanup_spaces(spaces: &mut SpaceMap) {
    let mut last_right = -10000;
    spaces.retain(|_, space| {
        if space.partial {
            return false;
        }
        let keep = space.rect.left() - last_right >= MIN_GAP_DISTANCE;
        last_right = space.rect.right();
        keep
    });
}

/// Find all the gaps between glyphs on `line`, from left to right.
pub fn find_line_spaces(img: &Pixmap<u8>, line: &TextLine, options: &OcrOptions) -> Vec<SpaceRegion> {
    let tolerance = options.char_split_tolerance;
    let (start, end) = (line.start, line.end);
    let mut spaces = SpaceMap::new();
    find_spaces(img, start, end, false, tolerance, &mut spaces);
    find_spaces(img, start, start + line.height() * 2 / 3, true, tolerance, &mut spaces);
    find_spaces(img, start + line.height() / 3, end, true, tolerance, &mut spaces);
    find_spaces(img, start, (start + end) / 2, true, tolerance, &mut spaces);
    find_spaces(img, (start + end) / 2, end, true, tolerance, &mut spaces);

    merge_spaces(img, start, end, options.merge_height_slack, &mut spaces);
    for space in spaces.values_mut() {
        extend_partial_space(img, start, end, space);
    }
    find_diagonal_breaks(img, start, end, tolerance, &mut spaces);
    cleanup_spaces(&mut spaces);
    spaces.into_values().collect()
}
