//! Finding lines of text, and measuring and removing italic slant.

use crate::errors::{Error, Result};
use crate::pixmap::{Pixmap, INK_THRESHOLD};

/// Bands shorter than this are diacritics or punctuation belonging to a
/// neighbouring line.
pub const MIN_LINE_HEIGHT: i32 = 20;

/// A detached band this close to a neighbour always joins it.
const CLOSE_GAP: i32 = 5;

/// We test slant angles of `n / ANGLE_STEPS` for `n` in `0..ANGLE_COUNT`.
const ANGLE_STEPS: f64 = 30.0;
const ANGLE_COUNT: usize = 20;

/// Angles `1..FIRST_SLANT` are too small to tell apart from noise.
const FIRST_SLANT: usize = 5;

/// A horizontal band of a caption containing a line of text.
#[derive(Clone, Debug, PartialEq)]
pub struct TextLine {
    /// The position of this band in the top-to-bottom scan.
    pub index: usize,
    /// The first row of the line.
    pub start: i32,
    /// One past the last row of the line.
    pub end: i32,
    /// The italic slant, in columns per row.  0 for upright text.
    pub angle: f64,
}

impl TextLine {
    fn new(index: usize, start: i32, end: i32) -> TextLine {
        TextLine { index, start, end, angle: 0.0 }
    }

    /// The height of the line in pixels.
    pub fn height(&self) -> i32 {
        self.end - self.start
    }

    /// Is this line set in italics?
    pub fn is_italic(&self) -> bool {
        self.angle != 0.0
    }
}

/// Split an image into lines of text.  Short bands are merged into a
/// neighbouring line.
pub fn find_text_lines(img: &Pixmap<u8>) -> Result<Vec<TextLine>> {
    let (width, height) = (img.w(), img.h());
    let mut bands = vec![];
    let mut y = 0;
    loop {
        while y < height && !img.row_has_ink(y, 0, width) {
            y += 1;
        }
        if y == height {
            break;
        }
        let start = y;
        while y < height && img.row_has_ink(y, 0, width) {
            y += 1;
        }
        if y == height {
            // Ink running into the bottom edge only counts if it's tall.
            if height - 1 - start > MIN_LINE_HEIGHT {
                bands.push(TextLine::new(bands.len(), start, height - 1));
            }
            break;
        }
        bands.push(TextLine::new(bands.len(), start, y));
    }

    let count = bands.len();
    let mut keep = vec![true; count];
    let mut last_full: Option<usize> = None;
    for i in 0..count {
        if bands[i].height() >= MIN_LINE_HEIGHT {
            last_full = Some(i);
            continue;
        }
        if count == 1 {
            return Err(Error::segmentation(
                "only one line of text, and it is too short"));
        }
        keep[i] = false;
        if i == 0 {
            bands[1].start = bands[0].start;
        } else if i == count - 1 {
            let Some(j) = last_full else {
                return Err(Error::segmentation("no full-height line of text"));
            };
            bands[j].end = bands[i].end;
        } else if let Some(j) = last_full {
            let top = bands[i].start - bands[j].end;
            let bottom = bands[i + 1].start - bands[i].end;
            let merge_up = if top < CLOSE_GAP || bottom / top > 2 {
                true
            } else if bottom < CLOSE_GAP || top / bottom > 2 {
                false
            } else {
                top < bottom
            };
            if merge_up {
                bands[j].end = bands[i].end;
            } else {
                bands[i + 1].start = bands[i].start;
            }
        } else {
            bands[i + 1].start = bands[i].start;
        }
    }

    let lines: Vec<TextLine> = bands
        .into_iter()
        .zip(keep)
        .filter_map(|(band, keep)| if keep { Some(band) } else { None })
        .collect();
    debug!("found {} text lines: {:?}", lines.len(),
           lines.iter().map(|l| (l.start, l.end)).collect::<Vec<_>>());
    Ok(lines)
}

/// The running estimate of the slant used by italic captions.  Every
/// caption in a stream tends to use the same italic font, so after we've
/// seen enough slanted lines, we lock in their average and only check
/// whether each new line uses it.
#[derive(Clone, Debug)]
pub struct ItalicState {
    window: usize,
    samples: Vec<f64>,
    locked: Option<f64>,
}

impl ItalicState {
    /// Average the first `window` slanted lines.
    pub fn new(window: usize) -> ItalicState {
        ItalicState { window, samples: vec![], locked: None }
    }

    /// The stream-wide italic angle, once we have one.
    pub fn locked_angle(&self) -> Option<f64> {
        self.locked
    }

    fn observe(&mut self, angle: f64) {
        if self.locked.is_some() || self.samples.len() >= self.window {
            return;
        }
        self.samples.push(angle);
        if self.samples.len() == self.window {
            let average = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
            debug!("locking italic angle at {:.4}", average);
            self.locked = Some(average);
        }
    }
}

/// Estimate the slant of `line` by finding the angle which leaves the
/// most columns free of ink.
pub fn find_line_angle(img: &Pixmap<u8>, line: &TextLine, italic: &mut ItalicState) -> f64 {
    let empty_columns = |angle: f64| {
        (0..img.w())
            .filter(|&x| !slanted_column_has_ink(img, x, angle, line.start, line.end))
            .count()
    };

    if let Some(angle) = italic.locked_angle() {
        let upright = empty_columns(0.0);
        let slanted = empty_columns(angle);
        return if slanted > upright { angle } else { 0.0 };
    }

    let mut best = (0, None);
    for step in (0..ANGLE_COUNT).filter(|&s| s == 0 || s >= FIRST_SLANT) {
        let count = empty_columns(step as f64 / ANGLE_STEPS);
        if count > best.0 {
            best = (count, Some(step));
        }
    }
    let step = best.1.unwrap_or(0);
    let angle = step as f64 / ANGLE_STEPS;
    if step != 0 {
        italic.observe(angle);
    }
    angle
}

/// Does a column slanted by `angle` contain ink between rows `y1` and
/// `y2`?  The column crosses `column` halfway down, and leans right as it
/// rises for positive angles.
pub fn slanted_column_has_ink(img: &Pixmap<u8>, column: i32, angle: f64, y1: i32, y2: i32) -> bool {
    if angle == 0.0 {
        return img.column_has_ink(column, y1, y2);
    }
    let width = img.w();
    let x1 = column + ((y2 - y1) as f64 * angle) as i32 / 2;
    let (y_min, y_max) = if angle > 0.0 {
        ((y1 + ((x1 - width + 1) as f64 / angle) as i32 + 1).max(y1),
         (y1 + (x1 as f64 / angle) as i32).min(y2))
    } else {
        ((y1 + (x1 as f64 / angle) as i32 + 1).max(y1),
         (y1 + ((x1 - width + 1) as f64 / angle) as i32).min(y2))
    };
    (y_min..y_max).any(|y| {
        img.at(x1 - ((y - y1) as f64 * angle) as i32, y) >= INK_THRESHOLD
    })
}

/// Which end of a slanted column is pinned to the given column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    Top,
    Bottom,
}

/// Like `slanted_column_has_ink`, but the column passes through `column`
/// at its top or bottom end instead of its middle.
pub fn anchored_column_has_ink(img: &Pixmap<u8>,
                               column: i32,
                               angle: f64,
                               y1: i32,
                               y2: i32,
                               anchor: Anchor)
                               -> bool {
    let half = ((y2 - y1) as f64 * angle) as i32 / 2;
    let center = match anchor {
        Anchor::Bottom => column + half,
        Anchor::Top => column - half,
    };
    slanted_column_has_ink(img, center, angle, y1, y2)
}

/// Shear rows `start..end` of `img` so that text slanted by `angle` comes
/// out upright.
pub fn correct_italics(img: &Pixmap<u8>, start: i32, end: i32, angle: f64) -> Pixmap<u8> {
    let mut out = img.clone();
    let width = img.w();
    let middle = (start + end) / 2;
    for y in start..end {
        let dx = angle * f64::from(middle - y);
        let shift = dx.floor();
        let p = dx - shift;
        let shift = shift as i32;
        for x in 0..width {
            let src = x + shift;
            let v = if src >= 0 && src + 1 < width {
                (1.0 - p) * f64::from(img.at(src, y)) + p * f64::from(img.at(src + 1, y))
            } else {
                0.0
            };
            out.set(x, y, v as u8);
        }
    }
    out
}

/// Find the slant of every line, and return a copy of `img` with all
/// italic lines sheared upright.
pub fn straighten_lines(img: &Pixmap<u8>, lines: &mut [TextLine], italic: &mut ItalicState)
                        -> Pixmap<u8> {
    let mut corrected = img.clone();
    for line in lines.iter_mut() {
        line.angle = find_line_angle(&corrected, line, italic);
        debug!("line {}..{} has angle {:.4}", line.start, line.end, line.angle);
        if line.is_italic() {
            corrected = correct_italics(&corrected, line.start, line.end, line.angle);
        }
    }
    corrected
}
