//! Reading whole `*.sup` files.

use std::fs;
use std::path::Path;

use crate::assemble::{assemble, AssembleOptions};
use crate::caption::{Caption, Coordinates, Frame};
use crate::errors::*;
use crate::segment::{
    segment_body, segment_header, CompositionObject, ObjectData, ObjectPart,
    Segment, HEADER_LEN,
};
use crate::util::BytesFormatter;

/// A caption which we are still reading segments for.
#[derive(Default)]
struct CaptionBuilder {
    caption: Caption,
    objects: Vec<CompositionObject>,
    /// The frame which will receive the next object segment.
    frame_index: usize,
    /// For each frame, the chunk which will receive the next segment.
    part_index: [usize; 2],
}

impl CaptionBuilder {
    fn new(start: u32, objects: Vec<CompositionObject>) -> CaptionBuilder {
        let forced = objects.first().map_or(false, |o| o.forced);
        CaptionBuilder {
            caption: Caption {
                start,
                forced,
                ..Caption::default()
            },
            objects,
            ..CaptionBuilder::default()
        }
    }

    fn has_bitmap(&self) -> bool {
        self.caption.frames.first().map_or(false, |f| f.has_bitmap())
    }

    /// Record an object data segment found at `offset`.
    fn add_object(&mut self, obj: ObjectData, offset: usize) -> Result<()> {
        let index = self.frame_index;
        if index >= 2 {
            return Err(Error::TooManyObjects { offset });
        }
        while self.caption.frames.len() <= index {
            self.caption.frames.push(Frame::default());
        }
        let frame = &mut self.caption.frames[index];
        let part = self.part_index[index];
        let last = match obj.part {
            ObjectPart::First { width, height, last, .. } => {
                if frame.chunks[part].is_some() {
                    return Err(Error::DuplicateSegment { offset });
                }
                frame.set_size(width, height);
                frame.chunks[part] = Some(obj.data);
                last
            }
            ObjectPart::Last => {
                if frame.chunks[1].is_some() {
                    return Err(Error::TooManySegments { offset });
                }
                if frame.chunks[0].is_none() {
                    return Err(Error::OrphanSegment { offset });
                }
                frame.chunks[part] = Some(obj.data);
                true
            }
        };
        if last {
            self.frame_index += 1;
        } else {
            self.part_index[index] = 1;
        }
        Ok(())
    }

    /// Finish this caption, copying its bitmaps out of `input`.
    fn finish(mut self, input: &[u8]) -> Caption {
        if !self.has_bitmap() {
            self.caption.empty = true;
        }
        let default_forced = self.caption.forced;
        for (i, frame) in self.caption.frames.iter_mut().enumerate() {
            let forced = self.objects.get(i).map_or(default_forced, |o| o.forced);
            frame.set_forced(forced);
            frame.load(input);
        }
        debug!("read caption: {:?}", &self.caption);
        self.caption
    }
}

/// Decode every display set in `input`, returning the raw captions in
/// stream order.  This includes "empty" captions, which only mark the end
/// of the previous caption.  None of them have end times yet.
pub fn read_captions(input: &[u8]) -> Result<Vec<Caption>> {
    if !input.starts_with(b"PG") {
        return Err(Error::NotSupStream);
    }

    let mut captions = vec![];
    let mut current: Option<CaptionBuilder> = None;
    let mut offset = 0;
    while offset < input.len() {
        let rest = &input[offset..];
        if !rest.starts_with(b"PG") {
            warn!("ignoring trailing data at 0x{:x}: {:?}",
                  offset, BytesFormatter(rest));
            break;
        }
        let (_, header) = segment_header(rest)
            .map_err(|_| Error::Truncated { offset })?;
        let body_start = offset + HEADER_LEN;
        let body_end = body_start + usize::from(header.length);
        if body_end > input.len() {
            return Err(Error::Truncated { offset });
        }
        let segment = segment_body(&header, &input[body_start..body_end], offset)?;

        match segment {
            Segment::Presentation(p) => {
                if let Some(unfinished) = current.take() {
                    close_unfinished(unfinished, input, &mut captions);
                }
                current = Some(CaptionBuilder::new(header.pts_ms(), p.objects));
            }
            Segment::Windows(windows) => match current.as_mut() {
                Some(b) => {
                    b.caption.frames = windows
                        .into_iter()
                        .map(|w| Frame::new(Coordinates {
                            x: w.x,
                            y: w.y,
                            width: w.width,
                            height: w.height,
                        }))
                        .collect();
                }
                None => warn!("window definition outside caption at 0x{:x}", offset),
            },
            Segment::Palette(entries) => match (current.as_mut(), entries) {
                (Some(b), None) => b.caption.empty = true,
                (Some(b), Some(entries)) => {
                    for e in entries {
                        b.caption.palette.set_ycrcb(e.index, e.y, e.cr, e.cb, e.alpha);
                    }
                }
                (None, _) => warn!("palette outside caption at 0x{:x}", offset),
            },
            Segment::Object(obj) => match current.as_mut() {
                Some(b) => b.add_object(obj, offset)?,
                None => warn!("object data outside caption at 0x{:x}", offset),
            },
            Segment::End => match current.take() {
                Some(b) => captions.push(b.finish(input)),
                None => warn!("end segment outside caption at 0x{:x}", offset),
            },
        }
        offset = body_end;
    }

    if let Some(unfinished) = current.take() {
        close_unfinished(unfinished, input, &mut captions);
    }
    Ok(captions)
}

/// Handle a caption that never saw its end segment.  Without a bitmap, it
/// still marks the end of the previous caption.
fn close_unfinished(b: CaptionBuilder, input: &[u8], captions: &mut Vec<Caption>) {
    if b.has_bitmap() {
        warn!("discarding unfinished caption at {}ms", b.caption.start);
    } else if b.caption.start != 0 {
        captions.push(b.finish(input));
    }
}

/// A parsed `*.sup` file.
#[derive(Debug)]
pub struct SupFile {
    captions: Vec<Caption>,
}

impl SupFile {
    /// Open and parse a `*.sup` file with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SupFile> {
        SupFile::open_with(path, &AssembleOptions::default())
    }

    /// Open and parse a `*.sup` file.
    pub fn open_with<P: AsRef<Path>>(path: P, options: &AssembleOptions)
                                     -> Result<SupFile> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        SupFile::from_bytes_with(&data, options)
    }

    /// Parse an in-memory `*.sup` stream with default options.
    pub fn from_bytes(data: &[u8]) -> Result<SupFile> {
        SupFile::from_bytes_with(data, &AssembleOptions::default())
    }

    /// Parse an in-memory `*.sup` stream.
    pub fn from_bytes_with(data: &[u8], options: &AssembleOptions) -> Result<SupFile> {
        let raw = read_captions(data)?;
        Ok(SupFile { captions: assemble(raw, options) })
    }

    /// Our captions, in display order.
    pub fn captions(&self) -> &[Caption] {
        &self.captions
    }

    /// Take ownership of our captions.
    pub fn into_captions(self) -> Vec<Caption> {
        self.captions
    }
}

/// Does the specified path appear to point to a `*.sup` file?
pub fn is_sup_file<P: AsRef<Path>>(path: P) -> Result<bool> {
    use std::io::Read;
    let path = path.as_ref();
    let mkerr = |source| Error::Io { path: path.to_owned(), source };
    let mut f = fs::File::open(path).map_err(mkerr)?;
    let mut magic = [0; 2];
    match f.read_exact(&mut magic) {
        Ok(()) => Ok(&magic == b"PG"),
        Err(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(mkerr(e)),
    }
}
