//! Tunable recognition settings.

use pgssub::AssembleOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{Error, Result};

/// Settings used while segmenting and recognizing captions.  Missing keys
/// in a configuration file take their default values.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct OcrOptions {
    /// Gaps wider than this many pixels become explicit spaces.
    pub minimum_space_width: i32,
    /// Gaps narrower than this may still separate two glyphs if they
    /// touch the edge of the image.
    pub char_split_tolerance: i32,
    /// How different a glyph may be from a learned shape, in units of 100
    /// score points.
    pub similarity_tolerance: i32,
    /// Contrast boost from 0 to 10.
    pub contrast: i32,
    /// Collapse identical consecutive captions, both as bitmaps and as
    /// text.
    pub combine_duplicates: bool,
    /// Write `''` as `"` in the text output.
    pub convert_double_apostrophes: bool,
    /// Leave italic tags out of the text output.
    pub strip_formatting: bool,
    /// Mark captions near the top of the screen so players show them
    /// there too.
    pub preserve_positions: bool,
    /// Milliseconds subtracted from every caption time in the text output.
    pub pts_offset_ms: i64,
    /// Turn commas floating above the line into apostrophes, and the
    /// reverse.
    pub replace_high_commas: bool,
    /// Symbols so thin that a space next to them is usually a mistake.
    pub narrow_characters: Vec<String>,
    /// How many italic lines we average before locking in an angle.
    pub italic_window: usize,
    /// How many successful matches a reference font needs before we try
    /// it first.
    pub default_font_hits: usize,
    /// How much shorter a merged partial space may be than the spaces it
    /// replaces.
    pub merge_height_slack: i32,
}

impl Default for OcrOptions {
    fn default() -> OcrOptions {
        OcrOptions {
            minimum_space_width: 12,
            char_split_tolerance: 2,
            similarity_tolerance: 5,
            contrast: 0,
            combine_duplicates: true,
            convert_double_apostrophes: true,
            strip_formatting: false,
            preserve_positions: false,
            pts_offset_ms: 0,
            replace_high_commas: true,
            narrow_characters: vec![],
            italic_window: 20,
            default_font_hits: 10,
            merge_height_slack: 5,
        }
    }
}

impl OcrOptions {
    /// Load options from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<OcrOptions> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&json).map_err(|source| Error::Config {
            path: path.to_owned(),
            source,
        })
    }

    /// The maximum score accepted by the matcher.
    pub fn match_tolerance(&self) -> i32 {
        self.similarity_tolerance * 100
    }

    /// Should a space next to `symbol` be double-checked?
    pub fn is_narrow(&self, symbol: &str) -> bool {
        self.narrow_characters.iter().any(|c| c == symbol)
    }

    /// The caption assembly settings implied by these options.
    pub fn assemble_options(&self) -> AssembleOptions {
        AssembleOptions {
            combine_duplicates: self.combine_duplicates,
            ..AssembleOptions::default()
        }
    }
}
