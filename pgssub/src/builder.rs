//! Writing synthetic `*.sup` streams, mostly for tests and fixtures.
//!
//! ```
//! use pgssub::builder::SupBuilder;
//! use pgssub::segment::PaletteEntry;
//!
//! let white = PaletteEntry { index: 1, y: 235, cr: 128, cb: 128, alpha: 255 };
//! let data = SupBuilder::new()
//!     .caption(1000, 2000, (2, 1), &[1, 1], &[white])
//!     .build();
//! let sup = pgssub::SupFile::from_bytes(&data).unwrap();
//! assert_eq!(sup.captions().len(), 1);
//! ```

use crate::img::{compress, Size};
use crate::segment::{PaletteEntry, END, OBJECT, PALETTE, PRESENTATION, WINDOW};

/// The longest body a segment can carry.
const MAX_SEGMENT_BODY: usize = u16::MAX as usize;

/// Bytes before the bitmap in a first or only object segment.
const FIRST_OBJECT_HEADER: usize = 11;

/// Where `caption` places its bitmaps.
const DEFAULT_POSITION: (u16, u16) = (100, 800);

/// Builds a PGS stream one segment at a time.
#[derive(Clone, Debug, Default)]
pub struct SupBuilder {
    data: Vec<u8>,
}

impl SupBuilder {
    /// Create an empty stream.
    pub fn new() -> SupBuilder {
        SupBuilder::default()
    }

    /// Append a raw segment.
    ///
    /// # Panics
    ///
    /// If `body` is longer than a segment header can describe.
    pub fn segment(&mut self, pts_ms: u32, kind: u8, body: &[u8]) -> &mut SupBuilder {
        let length = match u16::try_from(body.len()) {
            Ok(length) => length,
            Err(_) => panic!("segment body of {} bytes is longer than {}",
                             body.len(), MAX_SEGMENT_BODY),
        };
        self.data.extend_from_slice(b"PG");
        self.data.extend_from_slice(&pts_ms.wrapping_mul(90).to_be_bytes());
        self.data.extend_from_slice(&0u32.to_be_bytes());
        self.data.push(kind);
        self.data.extend_from_slice(&length.to_be_bytes());
        self.data.extend_from_slice(body);
        self
    }

    /// Start a caption showing one object per `(forced, x, y)` entry.
    pub fn presentation(&mut self, pts_ms: u32, objects: &[(bool, u16, u16)])
                        -> &mut SupBuilder {
        let mut body = vec![];
        body.extend_from_slice(&1920u16.to_be_bytes());
        body.extend_from_slice(&1080u16.to_be_bytes());
        body.extend_from_slice(&[0x10, 0x00, 0x00, 0x80, 0x00, 0x00]);
        body.push(objects.len() as u8);
        for (i, &(forced, x, y)) in objects.iter().enumerate() {
            body.extend_from_slice(&(i as u16).to_be_bytes());
            body.push(i as u8);
            body.push(if forced { 0x40 } else { 0x00 });
            body.extend_from_slice(&x.to_be_bytes());
            body.extend_from_slice(&y.to_be_bytes());
        }
        self.segment(pts_ms, PRESENTATION, &body)
    }

    /// Define windows as `(x, y, width, height)`.
    pub fn windows(&mut self, pts_ms: u32, windows: &[(u16, u16, u16, u16)])
                   -> &mut SupBuilder {
        let mut body = vec![windows.len() as u8];
        for (i, &(x, y, w, h)) in windows.iter().enumerate() {
            body.push(i as u8);
            for v in [x, y, w, h] {
                body.extend_from_slice(&v.to_be_bytes());
            }
        }
        self.segment(pts_ms, WINDOW, &body)
    }

    /// Define palette entries.
    pub fn palette(&mut self, pts_ms: u32, entries: &[PaletteEntry]) -> &mut SupBuilder {
        let mut body = vec![0, 0];
        for e in entries {
            body.extend_from_slice(&[e.index, e.y, e.cr, e.cb, e.alpha]);
        }
        self.segment(pts_ms, PALETTE, &body)
    }

    /// Append an object split into a first segment holding `split` bytes of
    /// `rle`, and a last segment holding the rest.  A `split` covering all
    /// of `rle` writes a single segment.  `split` is lowered if the first
    /// segment would otherwise be too long.
    ///
    /// # Panics
    ///
    /// If `rle` doesn't fit in two segments.
    pub fn object(&mut self, pts_ms: u32, size: (u16, u16), rle: &[u8], split: usize)
                  -> &mut SupBuilder {
        let split = split.min(rle.len()).min(MAX_SEGMENT_BODY - FIRST_OBJECT_HEADER);
        let only = split == rle.len();
        let mut first = vec![0, 0, 0, if only { 0xc0 } else { 0x80 }];
        let total = (rle.len() + 4) as u32;
        first.extend_from_slice(&total.to_be_bytes()[1..]);
        first.extend_from_slice(&size.0.to_be_bytes());
        first.extend_from_slice(&size.1.to_be_bytes());
        first.extend_from_slice(&rle[..split]);
        self.segment(pts_ms, OBJECT, &first);
        if !only {
            let mut last = vec![0, 0, 0, 0x40];
            last.extend_from_slice(&rle[split..]);
            self.segment(pts_ms, OBJECT, &last);
        }
        self
    }

    /// End the current caption.
    pub fn end(&mut self, pts_ms: u32) -> &mut SupBuilder {
        self.segment(pts_ms, END, &[])
    }

    /// Append a complete caption showing `pixels` (palette indices, in
    /// row-major order) from `start_ms`, followed by an empty display set
    /// at `end_ms` which clears it.
    pub fn caption(&mut self,
                   start_ms: u32,
                   end_ms: u32,
                   size: (u16, u16),
                   pixels: &[u8],
                   palette: &[PaletteEntry])
                   -> &mut SupBuilder {
        self.caption_at(start_ms, end_ms, DEFAULT_POSITION, size, pixels, palette)
    }

    /// Like `caption`, but with the bitmap's top-left corner at `position`.
    pub fn caption_at(&mut self,
                      start_ms: u32,
                      end_ms: u32,
                      position: (u16, u16),
                      size: (u16, u16),
                      pixels: &[u8],
                      palette: &[PaletteEntry])
                      -> &mut SupBuilder {
        let (x, y) = position;
        let rle = compress(Size { w: usize::from(size.0), h: usize::from(size.1) }, pixels);
        self.presentation(start_ms, &[(false, x, y)])
            .windows(start_ms, &[(x, y, size.0, size.1)])
            .palette(start_ms, palette)
            .object(start_ms, size, &rle, rle.len())
            .end(start_ms)
            .clear(end_ms)
    }

    /// Append an empty display set, which ends the previous caption.
    pub fn clear(&mut self, pts_ms: u32) -> &mut SupBuilder {
        let (x, y) = DEFAULT_POSITION;
        self.presentation(pts_ms, &[])
            .windows(pts_ms, &[(x, y, 1, 1)])
            .end(pts_ms)
    }

    /// The stream so far.
    pub fn build(&self) -> Vec<u8> {
        self.data.clone()
    }
}
