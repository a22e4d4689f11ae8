//! Glyphs, and how we compare their shapes.

use std::cmp::min;
use std::fmt;

use crate::geom::Rect;
use crate::pixmap::Pixmap;

/// Shown in place of glyphs we couldn't recognize.
pub const UNKNOWN_SYMBOL: &str = "¤";

/// The symbol used for line breaks.
pub const LINE_BREAK: &str = "\n";

/// The symbol used for spaces.
pub const SPACE: &str = " ";

/// The score returned for glyphs which are too different in size to
/// compare.
pub const NO_MATCH: i32 = 999_999;

/// Pixels brighter than this count when measuring borders.
const BORDER_INK: u8 = 200;

/// Borders which differ by more than this rule out a match.
const BORDER_TOLERANCE: f64 = 4.0;

/// Border samples which disagree by more than this are unreliable.
const BORDER_SPREAD: f64 = 3.0;

/// A border that couldn't be measured reliably.
const UNDEFINED_BORDER: f64 = -1.0;

/// Penalty added when one glyph has ink the other lacks entirely.
const STRUCTURAL_PENALTY: i32 = 1000;

/// One side of a glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

const SIDES: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

/// The pixels of a glyph, trimmed to its ink, plus the distance from each
/// edge to the first ink, which lets us rule out most candidates cheaply.
#[derive(Clone, PartialEq)]
pub struct GlyphShape {
    pixels: Pixmap<u8>,
    borders: [f64; 4],
}

impl GlyphShape {
    /// Wrap a trimmed intensity image.
    pub fn new(pixels: Pixmap<u8>) -> GlyphShape {
        let mut borders = [0.0; 4];
        for (border, side) in borders.iter_mut().zip(SIDES) {
            *border = averaged_border(&pixels, side);
        }
        GlyphShape { pixels, borders }
    }

    /// The width in pixels.
    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    /// The height in pixels.
    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    /// The intensities.
    pub fn pixels(&self) -> &Pixmap<u8> {
        &self.pixels
    }

    /// Could `self` and `other` possibly be the same glyph, judging only by
    /// the distances from their edges to their ink?
    pub fn borders_match(&self, other: &GlyphShape) -> bool {
        self.borders.iter().zip(other.borders.iter()).all(|(&a, &b)| {
            a == UNDEFINED_BORDER || b == UNDEFINED_BORDER || (a - b).abs() <= BORDER_TOLERANCE
        })
    }

    /// How different is `candidate` from this glyph?  0 is identical, and
    /// anything over 1000 means one has ink where the other has none.
    pub fn score(&self, candidate: &GlyphShape) -> i32 {
        let (qw, qh) = (self.pixels.w(), self.pixels.h());
        let (cw, ch) = (candidate.pixels.w(), candidate.pixels.h());
        if (cw - qw).abs() > 1 || (ch - qh).abs() > 1 {
            return NO_MATCH;
        }
        let shift = find_translation(&self.pixels, &candidate.pixels);
        let moved = shifted(&candidate.pixels, -shift);
        let diff = difference(&self.pixels, &moved) + difference(&moved, &self.pixels);
        if diff > 0 {
            return diff.saturating_add(STRUCTURAL_PENALTY);
        }
        min(STRUCTURAL_PENALTY, mean_square(&self.pixels, &moved) / 10)
    }
}

impl fmt::Debug for GlyphShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GlyphShape({}x{}, borders: {:?})", self.width(), self.height(), self.borders)
    }
}

/// The distance from `side` to the first bright pixel, measured along the
/// column or row `position`, with a fractional part estimated from the
/// anti-aliasing of the neighbouring pixel.
fn border_width(img: &Pixmap<u8>, side: Side, position: i32) -> f64 {
    let (w, h) = (img.w(), img.h());
    let px = |x: i32, y: i32| f64::from(img.at(x, y));
    let bright = |x: i32, y: i32| img.at(x, y) > BORDER_INK;
    match side {
        Side::Top | Side::Bottom => {
            if position < 0 || position >= w {
                return 0.0;
            }
            let x = position;
            if side == Side::Top {
                (0..h).find(|&y| bright(x, y)).map_or(0.0, |y| {
                    if y == 0 { 0.0 } else { f64::from(y) - px(x, y - 1) / px(x, y) }
                })
            } else {
                (0..h).rev().find(|&y| bright(x, y)).map_or(0.0, |y| {
                    if y == h - 1 { f64::from(y) } else { f64::from(y) + px(x, y + 1) / px(x, y) }
                })
            }
        }
        Side::Left | Side::Right => {
            if position < 0 || position >= h {
                return 0.0;
            }
            let y = position;
            if side == Side::Left {
                (0..w).find(|&x| bright(x, y)).map_or(0.0, |x| {
                    if x == 0 { 0.0 } else { f64::from(x) - px(x - 1, y) / px(x, y) }
                })
            } else {
                (0..w).rev().find(|&x| bright(x, y)).map_or(0.0, |x| {
                    if x == w - 1 { f64::from(x) } else { f64::from(x) + px(x + 1, y) / px(x, y) }
                })
            }
        }
    }
}

/// The border measured at the middle of `side` and on either side of it,
/// or `UNDEFINED_BORDER` if those disagree.
fn averaged_border(img: &Pixmap<u8>, side: Side) -> f64 {
    let middle = match side {
        Side::Top | Side::Bottom => img.w() / 2,
        Side::Left | Side::Right => img.h() / 2,
    };
    let sample = |p: i32| border_width(img, side, p);
    let samples = [sample(middle - 1), sample(middle), sample(middle + 1)];
    let average = samples.iter().sum::<f64>() / 3.0;
    if samples.iter().any(|s| (s - average).abs() > BORDER_SPREAD) {
        UNDEFINED_BORDER
    } else {
        average
    }
}

/// How far to the right `candidate` sits compared to `query`, judging by
/// their left and right borders at three heights.
fn find_translation(query: &Pixmap<u8>, candidate: &Pixmap<u8>) -> f64 {
    let step = query.h() / 5;
    let mut total = 0.0;
    for i in 1..=3 {
        let row = step * i;
        total += border_width(candidate, Side::Right, row) - border_width(query, Side::Right, row);
        total += border_width(candidate, Side::Left, row) - border_width(query, Side::Left, row);
    }
    total / 6.0
}

/// Move `img` right by `amount` pixels, blending neighbouring columns for
/// fractional amounts.
fn shifted(img: &Pixmap<u8>, amount: f64) -> Pixmap<u8> {
    if amount == 0.0 {
        return img.clone();
    }
    let first = amount.trunc() as i32;
    let second = first + amount.signum() as i32;
    let fraction = amount.abs().fract();
    let mut out = Pixmap::blank(img.width(), img.height());
    for y in 0..img.h() {
        for x in 0..img.w() {
            let a = f64::from(img.at(x - first, y));
            let b = f64::from(img.at(x - second, y));
            out.set(x, y, ((1.0 - fraction) * a + fraction * b) as u8);
        }
    }
    out
}

/// Each pixel becomes the brightest of itself and its four neighbours,
/// doubled.
fn widen(img: &Pixmap<u8>) -> Pixmap<u8> {
    let mut out = Pixmap::blank(img.width(), img.height());
    for y in 0..img.h() {
        for x in 0..img.w() {
            let brightest = [(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)]
                .iter()
                .map(|&(dx, dy)| img.at(x + dx, y + dy))
                .max()
                .unwrap_or(0);
            out.set(x, y, brightest.saturating_mul(2));
        }
    }
    out
}

/// How much ink does `a` have that isn't near any ink in `b`?
fn difference(a: &Pixmap<u8>, b: &Pixmap<u8>) -> i32 {
    let widened = widen(b);
    let (w, h) = (min(a.w(), b.w()), min(a.h(), b.h()));
    let mut total = 0;
    for y in 0..h {
        for x in 0..w {
            total += (i32::from(a.at(x, y)) - i32::from(widened.at(x, y))).max(0);
        }
    }
    total
}

/// The mean squared difference over the area both images cover.
fn mean_square(a: &Pixmap<u8>, b: &Pixmap<u8>) -> i32 {
    let (w, h) = (min(a.w(), b.w()), min(a.h(), b.h()));
    if w == 0 || h == 0 {
        return 0;
    }
    let mut total: i64 = 0;
    for y in 0..h {
        for x in 0..w {
            let d = i64::from(a.at(x, y)) - i64::from(b.at(x, y));
            total += d * d;
        }
    }
    (total / i64::from(h) / i64::from(w)) as i32
}

/// A character-sized piece of a caption.
#[derive(Clone, Debug)]
pub struct Glyph {
    /// Where this glyph was found, in padded caption coordinates.
    pub rect: Rect,
    /// The slant of the line this glyph is on.
    pub angle: f64,
    /// Which text line this glyph belongs to.
    pub line: usize,
    /// How far the middle of the glyph sits below the middle of its line.
    pub rise: i32,
    /// The recognized symbol, if we know it.
    pub symbol: Option<String>,
    /// The pixels, for glyphs that need recognizing.
    pub shape: Option<GlyphShape>,
}

impl Glyph {
    /// A glyph with pixels that needs recognizing.
    pub fn new(rect: Rect, angle: f64, line: usize, shape: GlyphShape) -> Glyph {
        Glyph { rect, angle, line, rise: 0, symbol: None, shape: Some(shape) }
    }

    /// An explicit space.
    pub fn space(rect: Rect, angle: f64, line: usize) -> Glyph {
        Glyph { rect, angle, line, rise: 0, symbol: Some(SPACE.to_owned()), shape: None }
    }

    /// The break before text line `line`.
    pub fn line_break(rect: Rect, line: usize) -> Glyph {
        Glyph { rect, angle: 0.0, line, rise: 0, symbol: Some(LINE_BREAK.to_owned()), shape: None }
    }

    /// Have we assigned a symbol to this glyph?
    pub fn is_resolved(&self) -> bool {
        self.symbol.is_some()
    }

    /// Is this glyph on an italic line?
    pub fn is_italic(&self) -> bool {
        self.angle != 0.0
    }

    /// Is this an explicit space?
    pub fn is_space(&self) -> bool {
        self.symbol.as_deref() == Some(SPACE)
    }

    /// The symbol, or a placeholder if we don't know it.
    pub fn text(&self) -> &str {
        self.symbol.as_deref().unwrap_or(UNKNOWN_SYMBOL)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::pixmap_from_rows;

    fn letter_l() -> GlyphShape {
        GlyphShape::new(pixmap_from_rows(&[
            "##....",
            "##....",
            "##....",
            "##....",
            "##....",
            "######",
        ]))
    }

    #[test]
    fn identical_shapes_score_zero() {
        let l = letter_l();
        assert!(l.borders_match(&l));
        assert_eq!(l.score(&l.clone()), 0);
    }

    #[test]
    fn different_sizes_never_match() {
        let small = GlyphShape::new(pixmap_from_rows(&["##", "##"]));
        assert_eq!(letter_l().score(&small), NO_MATCH);
    }

    #[test]
    fn missing_strokes_cost_more_than_blur() {
        let l = letter_l();
        let i = GlyphShape::new(pixmap_from_rows(&[
            "##....",
            "##....",
            "##....",
            "##....",
            "##....",
            "##....",
        ]));
        assert!(l.score(&i) > STRUCTURAL_PENALTY);
        let mut faded = l.pixels().clone();
        *faded.get_mut(5, 5) = 200;
        let faded = GlyphShape::new(faded);
        let score = l.score(&faded);
        assert!(score > 0 && score <= STRUCTURAL_PENALTY, "score: {}", score);
    }

    #[test]
    fn borders_measure_distance_to_ink() {
        let img = pixmap_from_rows(&[
            "......",
            "..##..",
            "..##..",
            "..##..",
            "......",
        ]);
        assert_eq!(border_width(&img, Side::Top, 2), 1.0);
        assert_eq!(border_width(&img, Side::Left, 2), 2.0);
        assert_eq!(border_width(&img, Side::Right, 2), 3.0);
        assert_eq!(border_width(&img, Side::Bottom, 2), 3.0);
        assert_eq!(border_width(&img, Side::Top, 0), 0.0);
        assert_eq!(border_width(&img, Side::Top, 99), 0.0);
    }

    #[test]
    fn ragged_borders_are_undefined() {
        let img = pixmap_from_rows(&[
            "#.....",
            "#.....",
            "#....#",
            "#.....",
            "#.....",
        ]);
        assert_eq!(averaged_border(&img, Side::Right), UNDEFINED_BORDER);
        assert_eq!(averaged_border(&img, Side::Left), 0.0);
    }

    #[test]
    fn thin_glyphs_sample_outside_the_image() {
        let img = pixmap_from_rows(&[".", "#", "#", "#", "#", "#"]);
        assert_eq!(averaged_border(&img, Side::Top), 1.0 / 3.0);
    }

    #[test]
    fn shifting_moves_ink() {
        let img = pixmap_from_rows(&["#..."]);
        assert_eq!(shifted(&img, 2.0).data(), &[0, 0, 255, 0]);
        assert_eq!(shifted(&img, 0.5).data(), &[127, 127, 0, 0]);
        let img = pixmap_from_rows(&["..#."]);
        assert_eq!(shifted(&img, -1.0).data(), &[0, 255, 0, 0]);
    }

    #[test]
    fn widening_spreads_and_doubles() {
        let mut img = Pixmap::blank(3, 3);
        *img.get_mut(1, 1) = 100;
        let wide = widen(&img);
        assert_eq!(wide.data(), &[0, 200, 0, 200, 200, 200, 0, 200, 0]);
    }

    #[test]
    fn glyph_text_falls_back_to_placeholder() {
        let glyph = Glyph::new(Rect::ltwh(0, 0, 6, 6), 0.0, 0, letter_l());
        assert_eq!(glyph.text(), UNKNOWN_SYMBOL);
        assert!(Glyph::space(Rect::default(), 0.2, 0).is_space());
    }
}
