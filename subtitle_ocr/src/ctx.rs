//! The main OCR driver.

use image::RgbaImage;
use std::path::{Path, PathBuf};

use crate::config::OcrOptions;
use crate::errors::{Error, Result};
use crate::ext::RangeExt;
use crate::fonts::{FontMatch, FontSet};
use crate::glyph::Glyph;
use crate::lines::{find_text_lines, straighten_lines, ItalicState, TextLine};
use crate::pixmap::{Pixel, Pixmap};
use crate::segmentation::{segment, segmentation_overlay};

/// Glyphs rising or sinking further than this relative to their line look
/// like an apostrophe or a comma, respectively.
const HIGH_COMMA_RISE: i32 = 10;

/// A caption which has been cut into glyphs.
#[derive(Clone, Debug)]
pub struct ScannedCaption {
    index: usize,
    lines: Vec<TextLine>,
    glyphs: Vec<Glyph>,
    /// The same glyphs, cut from the image before italics were
    /// straightened.
    alternatives: Vec<Glyph>,
}

impl ScannedCaption {
    /// The caption's index in its stream.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The lines of text we found.
    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    /// The glyphs, in reading order.
    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    /// Glyphs we couldn't recognize.
    pub fn unresolved(&self) -> impl Iterator<Item = &Glyph> {
        self.glyphs.iter().filter(|g| !g.is_resolved())
    }

    /// Has every glyph been recognized?
    pub fn is_complete(&self) -> bool {
        self.unresolved().next().is_none()
    }

    /// The text as runs of `(text, italic)`.
    pub fn text_runs(&self) -> Vec<(String, bool)> {
        let mut runs: Vec<(String, bool)> = vec![];
        for glyph in &self.glyphs {
            match runs.last_mut() {
                Some((text, italic)) if *italic == glyph.is_italic() => {
                    text.push_str(glyph.text());
                }
                _ => runs.push((glyph.text().to_owned(), glyph.is_italic())),
            }
        }
        runs
    }

    /// The text, with `<i>` tags around italics, and `¤` for glyphs we
    /// couldn't recognize.
    pub fn tagged_text(&self) -> String {
        let mut out = String::new();
        for (text, italic) in self.text_runs() {
            if italic {
                out.push_str("<i>");
                out.push_str(&text);
                out.push_str("</i>");
            } else {
                out.push_str(&text);
            }
        }
        out
    }

    /// The text without any markup.
    pub fn plain_text(&self) -> String {
        self.glyphs.iter().map(|g| g.text()).collect()
    }
}

/// An `OcrContext` represents a single movie's or episode's worth of
/// subtitles that we want to OCR.  It remembers the fonts we've learned and
/// the italic angle the stream uses.
pub struct OcrContext {
    options: OcrOptions,
    fonts: FontSet,
    italic: ItalicState,
    debug_dir: Option<PathBuf>,
}

impl OcrContext {
    /// Create a new `OcrContext`.
    pub fn new(options: OcrOptions, fonts: FontSet) -> OcrContext {
        let italic = ItalicState::new(options.italic_window);
        OcrContext { options, fonts, italic, debug_dir: None }
    }

    /// Our settings.
    pub fn options(&self) -> &OcrOptions {
        &self.options
    }

    /// The fonts we match against.
    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    /// The fonts we match against, for saving or editing.
    pub fn fonts_mut(&mut self) -> &mut FontSet {
        &mut self.fonts
    }

    /// The italic angle used by this stream, once we know it.
    pub fn italic_angle(&self) -> Option<f64> {
        self.italic.locked_angle()
    }

    /// Write intermediate images for every caption to `dir`.
    pub fn set_debug_dir<P: Into<PathBuf>>(&mut self, dir: P) {
        self.debug_dir = Some(dir.into());
    }

    /// Cut a caption image into glyphs.
    pub fn scan(&mut self, index: usize, image: &RgbaImage) -> Result<ScannedCaption> {
        let original = Pixmap::from_caption(image, self.options.contrast);
        let mut lines = find_text_lines(&original)?;
        let straightened = straighten_lines(&original, &mut lines, &mut self.italic);
        let glyphs = segment(&straightened, &lines, &self.options);
        let alternatives = if lines.iter().any(|l| l.is_italic()) {
            segment(&original, &lines, &self.options)
        } else {
            vec![]
        };
        debug!("caption {}: {} lines, {} glyphs", index, lines.len(), glyphs.len());
        if let Some(dir) = &self.debug_dir {
            write_debug_image(&straightened, dir, &format!("{:04}_input.png", index))?;
            let overlay = segmentation_overlay(&straightened, &glyphs);
            write_debug_image(&overlay, dir, &format!("{:04}_segmented.png", index))?;
        }
        Ok(ScannedCaption { index, lines, glyphs, alternatives })
    }

    fn find_match(&mut self, glyph: &Glyph) -> Option<FontMatch> {
        let shape = glyph.shape.as_ref()?;
        self.fonts.find_match(shape, self.options.match_tolerance())
    }

    /// Try to recognize every unresolved glyph.  If `report_unknown` is set,
    /// stop with `Error::UnknownSymbol` at the first glyph we can't
    /// recognize, so the caller can ask for a label.
    pub fn recognize(&mut self, caption: &mut ScannedCaption, report_unknown: bool) -> Result<()> {
        for i in 0..caption.glyphs.len() {
            if caption.glyphs[i].is_resolved() {
                continue;
            }
            let mut found = self.find_match(&caption.glyphs[i]);
            if found.is_none() && caption.glyphs[i].is_italic() {
                found = self.find_alternative(&caption.glyphs[i], &caption.alternatives);
            }
            let glyph = &mut caption.glyphs[i];
            match found {
                Some(found) => {
                    trace!("glyph at {:?} is {:?} ({})", glyph.rect, found.symbol, found.score);
                    glyph.symbol = Some(self.adjust_symbol(found.symbol, glyph.rise));
                }
                None if report_unknown => {
                    return Err(Error::UnknownSymbol { caption: caption.index });
                }
                None => {}
            }
        }
        fix_spaces(&mut caption.glyphs, &self.options);
        Ok(())
    }

    /// Straightening sometimes mangles a glyph, so try the unstraightened
    /// glyphs covering the same columns of the same line.
    fn find_alternative(&mut self, glyph: &Glyph, alternatives: &[Glyph]) -> Option<FontMatch> {
        let columns = glyph.rect.horizontal_range();
        alternatives
            .iter()
            .filter(|alt| alt.line == glyph.line && alt.shape.is_some())
            .filter(|alt| alt.rect.horizontal_range().overlaps(&columns))
            .find_map(|alt| self.find_match(alt))
    }

    fn adjust_symbol(&self, symbol: String, rise: i32) -> String {
        if !self.options.replace_high_commas {
            return symbol;
        }
        match symbol.as_str() {
            "," if rise < -HIGH_COMMA_RISE => "'".to_owned(),
            "'" if rise > HIGH_COMMA_RISE => ",".to_owned(),
            _ => symbol,
        }
    }

    /// Scan and recognize a caption in one step.
    pub fn ocr(&mut self, index: usize, image: &RgbaImage, report_unknown: bool)
               -> Result<ScannedCaption> {
        let mut caption = self.scan(index, image)?;
        self.recognize(&mut caption, report_unknown)?;
        Ok(caption)
    }

    /// Teach the user font that `glyph` is `symbol`, and resolve it.
    /// Returns false if the glyph has no pixels.
    pub fn insert(&mut self, glyph: &mut Glyph, symbol: &str) -> bool {
        let Some(shape) = &glyph.shape else {
            return false;
        };
        self.fonts.insert(symbol, shape.clone());
        glyph.symbol = Some(symbol.to_owned());
        true
    }

    /// Forget the user glyph matching `glyph`, and mark it unresolved.
    pub fn delete(&mut self, glyph: &mut Glyph) -> Option<String> {
        let shape = glyph.shape.as_ref()?;
        let removed = self.fonts.delete(shape, self.options.match_tolerance())?;
        glyph.symbol = None;
        Some(removed)
    }

    /// Move every user glyph into the reference font `target`.
    pub fn merge(&mut self, target: &str) -> Result<usize> {
        self.fonts.merge(target)
    }
}

/// Drop spaces next to narrow glyphs, unless they're wide enough to be
/// real.
pub fn fix_spaces(glyphs: &mut Vec<Glyph>, options: &OcrOptions) {
    let limit = options.minimum_space_width * 3 / 2 + 3;
    let doubtful = |g: &Glyph| g.is_space() && g.rect.width() + 6 < limit;
    let narrow = |g: &Glyph| g.symbol.as_deref().map_or(false, |s| options.is_narrow(s));
    let mut remove = vec![false; glyphs.len()];
    for i in 1..glyphs.len() {
        if doubtful(&glyphs[i]) && narrow(&glyphs[i - 1]) {
            remove[i] = true;
        }
        if narrow(&glyphs[i]) && doubtful(&glyphs[i - 1]) {
            remove[i - 1] = true;
        }
    }
    let mut i = 0;
    glyphs.retain(|_| {
        i += 1;
        !remove[i - 1]
    });
}

fn write_debug_image<P: Pixel>(pixmap: &Pixmap<P>, dir: &Path, name: &str) -> Result<()> {
    let path = dir.join(name);
    debug!("writing {}", path.display());
    pixmap.to_image()?.save(&path).map_err(|source| Error::Image { path, source })
}
