//! Writing recognized captions as `*.srt` files.

use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;
use pgssub::{srt_time, Caption};
use subtitle_ocr::{OcrOptions, ScannedCaption};

/// Frames starting above this row are shown at the top of the screen.
const TOP_OF_SCREEN: u16 = 300;

/// Tells players to show a caption at the top of the screen.
const TOP_POSITION_TAG: &str = "{\\an8}";

/// One numbered block of an SRT file.
#[derive(Clone, Debug, PartialEq, Eq)]
struct SrtEntry {
    start_ms: u32,
    end_ms: u32,
    text: String,
}

/// Write one SRT entry per scanned caption, numbered from 1, using the
/// timing of the caption it was scanned from.  Captions which produced no
/// text are left out.
pub(crate) fn write_srt<W: Write>(out: &mut W,
                                  captions: &[Caption],
                                  scanned: &[ScannedCaption],
                                  options: &OcrOptions)
                                  -> Result<usize> {
    let by_index: HashMap<usize, &Caption> =
        captions.iter().map(|c| (c.index(), c)).collect();
    let mut recognized = vec![];
    for result in scanned {
        match by_index.get(&result.index()) {
            Some(caption) => recognized.push((*caption, result.tagged_text())),
            None => warn!("no caption {} to take timing from", result.index()),
        }
    }
    let entries = srt_entries(&recognized, options);
    write_entries(out, &entries)?;
    Ok(entries.len())
}

fn write_entries<W: Write>(out: &mut W, entries: &[SrtEntry]) -> Result<()> {
    for (i, entry) in entries.iter().enumerate() {
        write!(out, "{}\n{} --> {}\n{}\n\n",
               i + 1, srt_time(entry.start_ms), srt_time(entry.end_ms), entry.text)?;
    }
    Ok(())
}

/// Turn recognized text into SRT entries, merging neighbours with the same
/// text if `options` asks for it.
fn srt_entries(recognized: &[(&Caption, String)], options: &OcrOptions) -> Vec<SrtEntry> {
    let shift = |t: u32| {
        let t = i64::from(t) - options.pts_offset_ms;
        u32::try_from(t.max(0)).unwrap_or(u32::MAX)
    };
    let mut entries: Vec<SrtEntry> = vec![];
    for (caption, text) in recognized {
        let Some(text) = srt_text(caption, text, options) else {
            continue;
        };
        let start_ms = shift(caption.start_ms());
        let end_ms = shift(caption.display_end_ms());
        match entries.last_mut() {
            Some(last) if options.combine_duplicates && last.text == text => {
                trace!("extending {:?} to {}", text, end_ms);
                last.end_ms = end_ms;
            }
            _ => entries.push(SrtEntry { start_ms, end_ms, text }),
        }
    }
    entries
}

/// The text we write for `caption`, or `None` if there isn't any.
fn srt_text(caption: &Caption, text: &str, options: &OcrOptions) -> Option<String> {
    let mut text = text.trim().to_owned();
    if options.convert_double_apostrophes {
        text = text.replace("''", "\"");
    }
    if options.strip_formatting {
        text = text.replace("<i>", "").replace("</i>", "");
    }
    if text.trim().is_empty() {
        return None;
    }
    let near_top = caption
        .frames()
        .first()
        .map_or(false, |f| f.coordinates().top() < TOP_OF_SCREEN);
    if options.preserve_positions && near_top {
        text.insert_str(0, TOP_POSITION_TAG);
    }
    Some(text)
}
