//! # PGS segment parsing.
//!
//! A `*.sup` file is a flat sequence of segments, each with a 13-byte
//! header:
//!
//! ```text
//! "PG" | PTS (u32) | DTS (u32) | type (u8) | length (u16) | body
//! ```
//!
//! Timestamps run at 90kHz.  A caption is built from a presentation
//! segment, window and palette definitions, one or more object data
//! segments, and a final end segment.

use nom::bytes::complete::{tag, take};
use nom::multi::count;
use nom::number::complete::{be_u16, be_u24, be_u32, be_u8};
use nom::IResult;
use std::ops::Range;

use crate::errors::*;
use crate::util::BytesFormatter;

/// Presentation composition segment.
pub const PRESENTATION: u8 = 0x16;
/// Window definition segment.
pub const WINDOW: u8 = 0x17;
/// Palette definition segment.
pub const PALETTE: u8 = 0x14;
/// Object (bitmap) data segment.
pub const OBJECT: u8 = 0x15;
/// End of display set.
pub const END: u8 = 0x80;

/// The size of a segment header.
pub const HEADER_LEN: usize = 13;

/// Object flag: this is the first segment of an object.
const FIRST_SEGMENT: u8 = 0x80;
/// Object flag: this is the last segment of an object.
const LAST_SEGMENT: u8 = 0x40;
/// Composition flag: display even when subtitles are turned off.
const FORCED: u8 = 0x40;

/// The fixed header of every segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Presentation time stamp, in 90kHz ticks.
    pub pts: u32,
    /// Decoding time stamp, in 90kHz ticks.
    pub dts: u32,
    /// The segment type.
    pub kind: u8,
    /// The length of the segment body.
    pub length: u16,
}

impl SegmentHeader {
    /// Presentation time in milliseconds.
    pub fn pts_ms(&self) -> u32 {
        self.pts / 90
    }
}

/// Parse a segment header.
pub fn segment_header(input: &[u8]) -> IResult<&[u8], SegmentHeader> {
    let (input, _) = tag(&b"PG"[..])(input)?;
    let (input, pts) = be_u32(input)?;
    let (input, dts) = be_u32(input)?;
    let (input, kind) = be_u8(input)?;
    let (input, length) = be_u16(input)?;
    Ok((input, SegmentHeader { pts, dts, kind, length }))
}

/// One object placed on screen by a presentation segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositionObject {
    /// The object to display.
    pub object_id: u16,
    /// The window to display it in.
    pub window_id: u8,
    /// Should this object be shown even when subtitles are off?
    pub forced: bool,
    /// Horizontal position.
    pub x: u16,
    /// Vertical position.
    pub y: u16,
}

fn composition_object(input: &[u8]) -> IResult<&[u8], CompositionObject> {
    let (input, object_id) = be_u16(input)?;
    let (input, window_id) = be_u8(input)?;
    let (input, flags) = be_u8(input)?;
    let (input, x) = be_u16(input)?;
    let (input, y) = be_u16(input)?;
    Ok((input, CompositionObject {
        object_id,
        window_id,
        forced: flags & FORCED != 0,
        x,
        y,
    }))
}

/// A presentation composition segment, which starts a new caption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Presentation {
    /// Width of the video.
    pub width: u16,
    /// Height of the video.
    pub height: u16,
    /// Objects shown by this caption.
    pub objects: Vec<CompositionObject>,
}

fn presentation(input: &[u8]) -> IResult<&[u8], Presentation> {
    let (input, width) = be_u16(input)?;
    let (input, height) = be_u16(input)?;
    // Frame rate, composition number, composition state, palette update
    // flag and palette ID.
    let (input, _) = take(6usize)(input)?;
    let (input, n) = be_u8(input)?;
    let (input, objects) = count(composition_object, usize::from(n))(input)?;
    Ok((input, Presentation { width, height, objects }))
}

/// A window into which an object will be drawn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Window {
    /// The window ID.
    pub id: u8,
    /// Left edge.
    pub x: u16,
    /// Top edge.
    pub y: u16,
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
}

fn window(input: &[u8]) -> IResult<&[u8], Window> {
    let (input, id) = be_u8(input)?;
    let (input, x) = be_u16(input)?;
    let (input, y) = be_u16(input)?;
    let (input, width) = be_u16(input)?;
    let (input, height) = be_u16(input)?;
    Ok((input, Window { id, x, y, width, height }))
}

/// A single palette entry, still in YCrCb.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaletteEntry {
    /// The palette index being defined.
    pub index: u8,
    /// Luma.
    pub y: u8,
    /// Red chroma.
    pub cr: u8,
    /// Blue chroma.
    pub cb: u8,
    /// Opacity.
    pub alpha: u8,
}

fn palette_entry(input: &[u8]) -> IResult<&[u8], PaletteEntry> {
    let (input, index) = be_u8(input)?;
    let (input, y) = be_u8(input)?;
    let (input, cr) = be_u8(input)?;
    let (input, cb) = be_u8(input)?;
    let (input, alpha) = be_u8(input)?;
    Ok((input, PaletteEntry { index, y, cr, cb, alpha }))
}

/// Which part of an object a data segment holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectPart {
    /// The first (or only) segment, with the object's size.
    First {
        /// Declared length of the whole object, including the 4-byte
        /// size fields.
        total_length: u32,
        /// Object width.
        width: u16,
        /// Object height.
        height: u16,
        /// Is this also the last segment?
        last: bool,
    },
    /// A continuation which completes the object.
    Last,
}

/// An object data segment.  `data` is an absolute byte range in the input
/// stream, so we can avoid copying bitmaps until a caption is complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectData {
    /// The object ID.
    pub object_id: u16,
    /// Object version.
    pub version: u8,
    /// Which part of the object this is.
    pub part: ObjectPart,
    /// Location of the compressed bitmap bytes.
    pub data: Range<usize>,
}

/// A decoded segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Start of a caption.
    Presentation(Presentation),
    /// Window definitions.
    Windows(Vec<Window>),
    /// Palette entries, or `None` for a "no palette" record.
    Palette(Option<Vec<PaletteEntry>>),
    /// Bitmap data.
    Object(ObjectData),
    /// End of caption.
    End,
}

/// Convert a `nom` failure into a truncation error at `offset`.
fn truncated<E>(offset: usize) -> impl Fn(nom::Err<E>) -> Error {
    move |_| Error::Truncated { offset }
}

/// Parse the body of a segment.  `offset` is the position of the segment
/// header in the stream, and `body` holds exactly `header.length` bytes.
pub fn segment_body(header: &SegmentHeader, body: &[u8], offset: usize)
                    -> Result<Segment> {
    let length = body.len();
    let bad_length = || Error::BadLength { kind: header.kind, length, offset };
    trace!("segment 0x{:02x} at 0x{:x}: {:?}",
           header.kind, offset, BytesFormatter(body));
    match header.kind {
        PRESENTATION => {
            let n = usize::from(*body.get(10).ok_or_else(bad_length)?);
            if length != 8 * n + 11 {
                return Err(bad_length());
            }
            if n > 2 {
                return Err(Error::TooManyObjects { offset });
            }
            let (_, p) = presentation(body).map_err(truncated(offset))?;
            Ok(Segment::Presentation(p))
        }
        WINDOW => {
            let n = *body.first().ok_or_else(bad_length)?;
            if n != 1 && n != 2 {
                return Err(Error::WindowCount { count: n });
            }
            let (_, windows) = count(window, usize::from(n))(&body[1..])
                .map_err(truncated(offset))?;
            Ok(Segment::Windows(windows))
        }
        PALETTE => {
            if length == 2 {
                return Ok(Segment::Palette(None));
            }
            if length % 5 != 2 {
                return Err(Error::PaletteLength { length });
            }
            let (_, entries) = count(palette_entry, (length - 2) / 5)(&body[2..])
                .map_err(truncated(offset))?;
            Ok(Segment::Palette(Some(entries)))
        }
        OBJECT => object_data(header, body, offset),
        END => {
            if length != 0 {
                return Err(bad_length());
            }
            Ok(Segment::End)
        }
        kind => Err(Error::UnknownSegment { kind, offset }),
    }
}

/// Parse an object data segment.
fn object_data(header: &SegmentHeader, body: &[u8], offset: usize)
               -> Result<Segment> {
    fn object_header(input: &[u8]) -> IResult<&[u8], (u16, u8, u8)> {
        let (input, id) = be_u16(input)?;
        let (input, version) = be_u8(input)?;
        let (input, flags) = be_u8(input)?;
        Ok((input, (id, version, flags)))
    }
    fn first_header(input: &[u8]) -> IResult<&[u8], (u32, u16, u16)> {
        let (input, total_length) = be_u24(input)?;
        let (input, width) = be_u16(input)?;
        let (input, height) = be_u16(input)?;
        Ok((input, (total_length, width, height)))
    }

    let length = body.len();
    let body_start = offset + HEADER_LEN;
    let (rest, (object_id, version, flags)) = object_header(body)
        .map_err(truncated(offset))?;
    let continuation = flags & (FIRST_SEGMENT | LAST_SEGMENT);
    if continuation == 0 {
        return Err(Error::UnexpectedContinuation { flags, offset });
    }

    let part = if continuation & FIRST_SEGMENT != 0 {
        let (_, (total_length, width, height)) = first_header(rest)
            .map_err(truncated(offset))?;
        let last = continuation & LAST_SEGMENT != 0;
        if last && cast::usize(total_length) + 7 != length {
            return Err(Error::BadLength { kind: header.kind, length, offset });
        }
        ObjectPart::First { total_length, width, height, last }
    } else {
        ObjectPart::Last
    };
    let skip = match part {
        ObjectPart::First { .. } => 11,
        ObjectPart::Last => 4,
    };
    Ok(Segment::Object(ObjectData {
        object_id,
        version,
        part,
        data: body_start + skip..body_start + length,
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    fn header(kind: u8, length: u16) -> SegmentHeader {
        SegmentHeader { pts: 90_000, dts: 0, kind, length }
    }

    #[test]
    fn parse_segment_header() {
        let input = &[
            b'P', b'G',
            0x00, 0x01, 0x5f, 0x90,
            0x00, 0x00, 0x00, 0x00,
            0x16,
            0x00, 0x13,
        ][..];
        let (rest, h) = segment_header(input).unwrap();
        assert!(rest.is_empty());
        assert_eq!(h, SegmentHeader { pts: 90_000, dts: 0, kind: 0x16, length: 0x13 });
        assert_eq!(h.pts_ms(), 1000);
    }

    #[test]
    fn parse_presentation() {
        let body = &[
            0x07, 0x80, 0x04, 0x38,
            0x10, 0x00, 0x00, 0x80, 0x00, 0x00,
            0x01,
            0x00, 0x00, 0x00, 0x40, 0x01, 0x00, 0x02, 0x00,
        ][..];
        let seg = segment_body(&header(PRESENTATION, 19), body, 0).unwrap();
        assert_eq!(seg, Segment::Presentation(Presentation {
            width: 1920,
            height: 1080,
            objects: vec![CompositionObject {
                object_id: 0,
                window_id: 0,
                forced: true,
                x: 256,
                y: 512,
            }],
        }));
    }

    #[test]
    fn presentation_length_must_match_object_count() {
        let body = &[
            0x07, 0x80, 0x04, 0x38,
            0x10, 0x00, 0x00, 0x80, 0x00, 0x00,
            0x02,
            0x00, 0x00, 0x00, 0x40, 0x01, 0x00, 0x02, 0x00,
        ][..];
        match segment_body(&header(PRESENTATION, 19), body, 0) {
            Err(Error::BadLength { kind: PRESENTATION, length: 19, .. }) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn window_count_must_be_one_or_two() {
        let body = &[0x03][..];
        assert!(matches!(segment_body(&header(WINDOW, 1), body, 0),
                         Err(Error::WindowCount { count: 3 })));
    }

    #[test]
    fn palette_lengths() {
        assert_eq!(segment_body(&header(PALETTE, 2), &[0, 0], 0).unwrap(),
                   Segment::Palette(None));
        assert!(matches!(segment_body(&header(PALETTE, 3), &[0, 0, 0], 0),
                         Err(Error::PaletteLength { length: 3 })));
        let body = &[0, 0, 1, 235, 128, 128, 255][..];
        assert_eq!(segment_body(&header(PALETTE, 7), body, 0).unwrap(),
                   Segment::Palette(Some(vec![PaletteEntry {
                       index: 1, y: 235, cr: 128, cb: 128, alpha: 255,
                   }])));
    }

    #[test]
    fn object_data_ranges_are_absolute() {
        // Only segment: 11 header bytes plus 3 data bytes.
        let body = &[
            0x00, 0x00, 0x00, 0xc0,
            0x00, 0x00, 0x07,
            0x00, 0x01, 0x00, 0x01,
            0x01, 0x00, 0x00,
        ][..];
        let seg = segment_body(&header(OBJECT, 14), body, 100).unwrap();
        match seg {
            Segment::Object(obj) => {
                assert_eq!(obj.data, 124..127);
                assert_eq!(obj.part, ObjectPart::First {
                    total_length: 7, width: 1, height: 1, last: true,
                });
            }
            other => panic!("unexpected segment {:?}", other),
        }
    }

    #[test]
    fn object_continuation_flags_are_checked() {
        let body = &[0x00, 0x00, 0x00, 0x00][..];
        assert!(matches!(segment_body(&header(OBJECT, 4), body, 0),
                         Err(Error::UnexpectedContinuation { flags: 0, .. })));
    }

    #[test]
    fn only_segment_length_is_checked() {
        let body = &[
            0x00, 0x00, 0x00, 0xc0,
            0x00, 0x00, 0x09,
            0x00, 0x01, 0x00, 0x01,
            0x01, 0x00, 0x00,
        ][..];
        assert!(matches!(segment_body(&header(OBJECT, 14), body, 0),
                         Err(Error::BadLength { kind: OBJECT, .. })));
    }

    #[test]
    fn end_must_be_empty_and_unknown_kinds_fail() {
        assert_eq!(segment_body(&header(END, 0), &[], 0).unwrap(), Segment::End);
        assert!(segment_body(&header(END, 1), &[0], 0).is_err());
        assert!(matches!(segment_body(&header(0x99, 0), &[], 7),
                         Err(Error::UnknownSegment { kind: 0x99, offset: 7 })));
    }
}
