//! Cutting lines of text into glyphs.

use crate::config::OcrOptions;
use crate::geom::Rect;
use crate::glyph::{Glyph, GlyphShape};
use crate::lines::TextLine;
use crate::pixmap::{Pixmap, SegmentInfo};
use crate::space::{find_line_spaces, Corner, Diagonal, SpaceRegion};

/// Which side of a glyph we're working on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edge {
    Left,
    Right,
}

/// Split every line of `img` into glyphs, with explicit spaces and line
/// breaks.
pub fn segment(img: &Pixmap<u8>, lines: &[TextLine], options: &OcrOptions) -> Vec<Glyph> {
    let mut glyphs = vec![];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            glyphs.push(Glyph::line_break(Rect::ltwh(1, line.start - 20, 10, 25), i));
        }
        let spaces = find_line_spaces(img, line, options);
        trace!("line {} has {} gaps", i, spaces.len());
        for pair in spaces.windows(2) {
            let (last, next) = (&pair[0], &pair[1]);
            if last.rect.left() != 0 && last.rect.width() > options.minimum_space_width {
                let rect = Rect::ltwh(last.rect.left() + 3,
                                      line.start + 4,
                                      last.rect.width() - 6,
                                      line.height() - 10);
                glyphs.push(Glyph::space(rect, line.angle, i));
            }
            let width = next.rect.left() - last.rect.right();
            if width < 0 {
                continue;
            }
            let rect = Rect::ltwh(last.rect.right(), line.start, width, line.height());
            if let Some(mut glyph) = extract_glyph(img, rect, line, i, last, next) {
                glyph.rise = (glyph.rect.top() + glyph.rect.bottom()) / 2
                    - (line.start + line.end) / 2;
                glyphs.push(glyph);
            }
        }
    }
    glyphs
}

/// Cut out the pixels between two gaps.
fn extract_glyph(img: &Pixmap<u8>,
                 rect: Rect,
                 line: &TextLine,
                 line_index: usize,
                 last: &SpaceRegion,
                 next: &SpaceRegion)
                 -> Option<Glyph> {
    let mut pixels = img.crop(&rect);
    let mut rect = rect;

    // Ink beyond a diagonal gap belongs to the neighbouring glyph.
    if let Some(d) = last.diagonal().filter(|d| d.corner.is_right()) {
        mask_wedge(&mut pixels, d, Edge::Left);
    }
    if let Some(d) = next.diagonal().filter(|d| !d.corner.is_right()) {
        mask_wedge(&mut pixels, d, Edge::Right);
    }

    // Ink beyond the straight part of a diagonal gap belongs to us.
    if let Some(d) = next.diagonal().filter(|d| d.corner.is_right()) {
        if let Some(wedge) = borrow_wedge(img, &rect, d, Edge::Right) {
            pixels = join_columns(&pixels, &wedge);
            rect = Rect::ltwh(rect.left(), rect.top(), pixels.w(), rect.height());
        }
    }
    if let Some(d) = last.diagonal().filter(|d| !d.corner.is_right()) {
        if let Some(wedge) = borrow_wedge(img, &rect, d, Edge::Left) {
            pixels = join_columns(&wedge, &pixels);
            rect = Rect::ltwh(rect.left() - wedge.w(), rect.top(), pixels.w(), rect.height());
        }
    }

    let top = (0..pixels.h()).find(|&y| pixels.row_has_ink(y, 0, pixels.w()))?;
    let bottom = (0..pixels.h()).rev().find(|&y| pixels.row_has_ink(y, 0, pixels.w()))? + 1;
    let trimmed = pixels.crop(&Rect::ltrb(0, top, pixels.w(), bottom));
    let rect = Rect::ltwh(rect.left(), rect.top() + top, trimmed.w(), bottom - top);
    Some(Glyph::new(rect, line.angle, line_index, GlyphShape::new(trimmed)))
}

/// The rows covered by the slanted part of `d`, and the distance of row
/// `y` from where the slant starts.
fn wedge_rows(d: &Diagonal, height: i32) -> (std::ops::Range<i32>, impl Fn(i32) -> i32) {
    let s = d.slope_start.clamp(0, height);
    let top = d.corner.is_top();
    let rows = if top { 0..s } else { s..height };
    let start = d.slope_start;
    (rows, move |y: i32| if top { start - y } else { y - start })
}

/// Zero the triangle of `pixels` cut off by the diagonal gap `d`, along
/// `edge`.
fn mask_wedge(pixels: &mut Pixmap<u8>, d: &Diagonal, edge: Edge) {
    let (w, h) = (pixels.w(), pixels.h());
    let (rows, distance) = wedge_rows(d, h);
    for y in rows {
        let n = (f64::from(distance(y)) * d.slope.abs()) as i32 + 1;
        let columns = match edge {
            Edge::Left => 0..n.min(w),
            Edge::Right => (w - n).max(0)..w,
        };
        for x in columns {
            pixels.set(x, y, 0);
        }
    }
}

/// Copy the triangle of ink just beyond `rect` on `edge` which the
/// diagonal gap `d` assigns to this glyph, trimmed to its ink.
fn borrow_wedge(img: &Pixmap<u8>, rect: &Rect, d: &Diagonal, edge: Edge) -> Option<Pixmap<u8>> {
    let h = rect.height();
    let k = d.slope.abs();
    let s = d.slope_start;
    let rows_below = if d.corner.is_top() { s } else { h - s };
    let reach = (f64::from(rows_below) * k) as i32 + if d.corner == Corner::TopRight { 0 } else { 1 };
    let available = match edge {
        Edge::Right => img.w() - rect.right(),
        Edge::Left => rect.left(),
    };
    let width = reach.min(available);
    if width <= 0 {
        return None;
    }
    let mut wedge = Pixmap::blank(width as usize, h as usize);
    let (rows, distance) = wedge_rows(d, h);
    for y in rows {
        let n = (f64::from(distance(y)) * k).round_ties_even() as i32;
        for i in 0..n.min(width) {
            let (dst, src) = match edge {
                Edge::Right => (i, rect.right() + i),
                Edge::Left => (width - 1 - i, rect.left() - 1 - i),
            };
            wedge.set(dst, y, img.at(src, rect.top() + y));
        }
    }

    // Keep only the columns between the glyph and the last ink.
    let inked = |x: i32| wedge.column_has_ink(x, 0, h);
    let keep = match edge {
        Edge::Right => 0..(0..width).rev().find(|&x| inked(x))? + 1,
        Edge::Left => (0..width).find(|&x| inked(x))?..width,
    };
    Some(wedge.crop(&Rect::ltrb(keep.start, 0, keep.end, h)))
}

/// Place two images of the same height side by side.
fn join_columns(left: &Pixmap<u8>, right: &Pixmap<u8>) -> Pixmap<u8> {
    let mut out = Pixmap::blank(left.width() + right.width(), left.height());
    for y in 0..left.h() {
        for x in 0..left.w() {
            out.set(x, y, left.at(x, y));
        }
        for x in 0..right.w() {
            out.set(left.w() + x, y, right.at(x, y));
        }
    }
    out
}

/// Draw each glyph's ink in its own colour, for debugging.
pub fn segmentation_overlay(img: &Pixmap<u8>, glyphs: &[Glyph]) -> Pixmap<SegmentInfo> {
    let mut overlay = Pixmap::blank(img.width(), img.height());
    for y in 0..img.h() {
        for x in 0..img.w() {
            if img.is_ink(x, y) {
                *overlay.get_mut(x as usize, y as usize) = SegmentInfo::Unassigned;
            }
        }
    }
    let shapes = glyphs.iter().filter(|g| g.shape.is_some());
    for (id, glyph) in shapes.enumerate() {
        let id = u16::try_from(id).unwrap_or(u16::MAX);
        let r = glyph.rect;
        for y in r.top().max(0)..r.bottom().min(img.h()) {
            for x in r.left().max(0)..r.right().min(img.w()) {
                if img.is_ink(x, y) {
                    *overlay.get_mut(x as usize, y as usize) = SegmentInfo::Id(id);
                }
            }
        }
    }
    overlay
}
