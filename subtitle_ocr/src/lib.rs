//! Recognize the text in bitmap subtitles, by cutting each caption into
//! glyphs and comparing them against glyphs we've learned before.
//!
//! ```no_run
//! extern crate pgssub;
//! extern crate subtitle_ocr;
//!
//! use subtitle_ocr::{FontSet, OcrContext, OcrOptions};
//!
//! let options = OcrOptions::default();
//! let fonts = FontSet::open("fonts", options.default_font_hits).unwrap();
//! let mut ctx = OcrContext::new(options, fonts);
//! let sup = pgssub::SupFile::open("movie.sup").unwrap();
//! for caption in sup.captions() {
//!     let image = caption.to_image().unwrap();
//!     let scanned = ctx.ocr(caption.index(), &image, false).unwrap();
//!     println!("{}", scanned.tagged_text());
//! }
//! ```
//!
//! Glyphs we can't recognize show up as `¤`.  To teach the context a new
//! glyph, pass it to `OcrContext::insert` along with its symbol, and save
//! the fonts with `FontSet::save`.

#![warn(missing_docs)]

#[macro_use]
extern crate log;

mod batch;
mod config;
mod ctx;
mod errors;
mod ext;
mod fonts;
mod geom;
mod glyph;
mod lines;
mod pixmap;
mod segmentation;
mod space;
#[cfg(test)]
mod test_util;

pub use self::batch::{BatchEvent, BatchWorker, ScanMode, ScanSummary};
pub use self::config::OcrOptions;
pub use self::ctx::{fix_spaces, OcrContext, ScannedCaption};
pub use self::errors::{Error, Result};
pub use self::fonts::{FontDatabase, FontEntry, FontKind, FontMatch, FontSet, USER_FONT};
pub use self::geom::Rect;
pub use self::glyph::{Glyph, GlyphShape, LINE_BREAK, SPACE, UNKNOWN_SYMBOL};
pub use self::lines::{TextLine, ItalicState};
pub use self::pixmap::Pixmap;
pub use self::space::{Corner, Diagonal, SpaceKind, SpaceRegion};
