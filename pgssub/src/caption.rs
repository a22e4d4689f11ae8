//! Decoded captions and the bitmaps they display.

use image::{ImageBuffer, RgbaImage};
use std::cell::OnceCell;
use std::fmt;
use std::ops::Range;

use crate::errors::*;
use crate::img::{decompress, Size};
use crate::palette::Palette;
use crate::util::srt_time;

/// The default length of a caption if no end time is known, in
/// milliseconds.
const DEFAULT_CAPTION_LENGTH: u32 = 5000;

/// Location at which to display a frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coordinates {
    pub(crate) x: u16,
    pub(crate) y: u16,
    pub(crate) width: u16,
    pub(crate) height: u16,
}

impl Coordinates {
    /// The leftmost edge of the frame.
    pub fn left(&self) -> u16 {
        self.x
    }

    /// The top edge of the frame.
    pub fn top(&self) -> u16 {
        self.y
    }

    /// The width of the frame.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// The height of the frame.
    pub fn height(&self) -> u16 {
        self.height
    }

    fn size(&self) -> Size {
        Size {
            w: usize::from(self.width),
            h: usize::from(self.height),
        }
    }
}

/// One bitmap placed on screen by a caption.
#[derive(Clone, Default)]
pub struct Frame {
    coordinates: Coordinates,
    forced: bool,
    /// Up to two byte ranges of the input holding compressed bitmap data.
    pub(crate) chunks: [Option<Range<usize>>; 2],
    /// The compressed bitmap, copied out of the input once the caption is
    /// complete.
    data: Vec<u8>,
    hash: OnceCell<u64>,
}

impl Frame {
    pub(crate) fn new(coordinates: Coordinates) -> Frame {
        Frame {
            coordinates,
            ..Frame::default()
        }
    }

    /// Where this frame is displayed.
    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    pub(crate) fn set_size(&mut self, width: u16, height: u16) {
        self.coordinates.width = width;
        self.coordinates.height = height;
    }

    /// Should this frame be shown even when subtitles are off?
    pub fn forced(&self) -> bool {
        self.forced
    }

    pub(crate) fn set_forced(&mut self, forced: bool) {
        self.forced = forced;
    }

    /// Does this frame carry any bitmap data?
    pub fn has_bitmap(&self) -> bool {
        self.chunks[0].is_some()
    }

    /// The lengths of the one or two compressed chunks.
    pub fn chunk_lengths(&self) -> [usize; 2] {
        let len = |c: &Option<Range<usize>>| c.as_ref().map_or(0, |r| r.len());
        [len(&self.chunks[0]), len(&self.chunks[1])]
    }

    /// The compressed bitmap.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Copy our compressed chunks out of `input`.
    pub(crate) fn load(&mut self, input: &[u8]) {
        self.data.clear();
        for range in self.chunks.iter().flatten() {
            self.data.extend_from_slice(&input[range.clone()]);
        }
        self.hash = OnceCell::new();
    }

    /// A cheap hash of our compressed bitmap, computed on first use.
    pub fn content_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            self.data.iter().fold(0u64, |hash, &b| {
                u64::from(b)
                    .wrapping_add(hash << 6)
                    .wrapping_add(hash << 16)
                    .wrapping_sub(hash)
            })
        })
    }

    /// Do two frames hold exactly the same compressed bitmap?
    pub fn same_content(&self, other: &Frame) -> bool {
        self.content_hash() == other.content_hash() && self.data == other.data
    }

    /// Decompress our bitmap into one palette index per pixel.
    pub fn indices(&self) -> Result<Vec<u8>> {
        decompress(self.coordinates.size(), &self.data)
    }

    /// Decompress our bitmap to an RGBA image.
    pub fn to_image(&self, palette: &Palette) -> Result<RgbaImage> {
        let indices = self.indices()?;
        let width = u32::from(self.coordinates.width);
        let height = u32::from(self.coordinates.height);
        Ok(ImageBuffer::from_fn(width, height, |x, y| {
            let offset = cast::usize(y * width + x);
            palette.get(indices[offset])
        }))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Frame")
            .field("coordinates", &self.coordinates)
            .field("forced", &self.forced)
            .field("chunks", &self.chunks)
            .finish()
    }
}

/// A single caption.
#[derive(Clone, Default)]
pub struct Caption {
    pub(crate) index: usize,
    pub(crate) start: u32,
    pub(crate) end: Option<u32>,
    pub(crate) forced: bool,
    pub(crate) frames: Vec<Frame>,
    pub(crate) palette: Palette,
    pub(crate) empty: bool,
}

impl Caption {
    /// The 1-based position of this caption in its file.  This is 0 until
    /// the captions have been assembled.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Start time, in milliseconds.
    pub fn start_ms(&self) -> u32 {
        self.start
    }

    /// End time, in milliseconds.  Only the last caption of a file may be
    /// missing one.
    pub fn end_ms(&self) -> Option<u32> {
        self.end
    }

    /// When this caption should disappear.  A caption without an end time
    /// is shown for five seconds.
    pub fn display_end_ms(&self) -> u32 {
        self.end.unwrap_or_else(|| self.start.saturating_add(DEFAULT_CAPTION_LENGTH))
    }

    /// Should this caption be shown even when subtitles are off?
    pub fn forced(&self) -> bool {
        self.forced
    }

    /// The frames displayed by this caption.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The palette shared by our frames.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Does this caption exist only to end the one before it?
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Decompress our first frame to an RGBA image.
    pub fn to_image(&self) -> Result<RgbaImage> {
        match self.frames.first() {
            Some(frame) => frame.to_image(&self.palette),
            None => Ok(RgbaImage::new(0, 0)),
        }
    }

    /// Decompress every frame with a bitmap.
    pub fn frame_images(&self) -> Result<Vec<RgbaImage>> {
        self.frames
            .iter()
            .filter(|f| f.has_bitmap())
            .map(|f| f.to_image(&self.palette))
            .collect()
    }

    /// Format our timing as an SRT time range, shifted by `offset_ms`.
    pub fn srt_timing(&self, offset_ms: i64) -> String {
        let shift = |t: u32| {
            let t = i64::from(t) + offset_ms;
            u32::try_from(t.max(0)).unwrap_or(u32::MAX)
        };
        format!("{} --> {}", srt_time(shift(self.start)), srt_time(shift(self.display_end_ms())))
    }
}

impl fmt::Debug for Caption {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Caption")
            .field("index", &self.index)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("forced", &self.forced)
            .field("frames", &self.frames)
            .field("empty", &self.empty)
            .finish()
    }
}
