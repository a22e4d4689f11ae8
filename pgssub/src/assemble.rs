//! Turning raw display sets into a clean list of captions.

use crate::caption::Caption;

/// Options controlling caption assembly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Collapse consecutive captions with identical bitmaps.
    pub combine_duplicates: bool,
    /// Two identical captions are only combined if the gap between them is
    /// smaller than this, in milliseconds.
    pub duplicate_gap_ms: u32,
}

impl Default for AssembleOptions {
    fn default() -> AssembleOptions {
        AssembleOptions {
            combine_duplicates: true,
            duplicate_gap_ms: 100,
        }
    }
}

/// Assemble raw captions, as returned by `read_captions`, into displayable
/// captions with end times and 1-based indices.
pub fn assemble(raw: Vec<Caption>, options: &AssembleOptions) -> Vec<Caption> {
    let captions = backfill_end_times(raw);
    let captions = split_dual_frames(captions);
    let mut captions = if options.combine_duplicates {
        combine_duplicates(captions, options.duplicate_gap_ms)
    } else {
        captions
    };
    for (i, caption) in captions.iter_mut().enumerate() {
        caption.index = i + 1;
    }
    captions
}

/// Give every caption an end time 1ms before the next display set starts,
/// and drop the empty captions that only exist to end their predecessor.
fn backfill_end_times(raw: Vec<Caption>) -> Vec<Caption> {
    let mut result: Vec<Caption> = Vec::with_capacity(raw.len());
    for caption in raw {
        let end = caption.start.saturating_sub(1);
        if caption.empty {
            if let Some(last) = result.last_mut() {
                last.end = Some(end);
            }
            continue;
        }
        if let Some(last) = result.last_mut() {
            if last.end.is_none() {
                last.end = Some(end);
            }
        }
        result.push(caption);
    }
    result
}

/// Split captions whose second frame carries a bitmap into two captions
/// with the same timing and palette.
fn split_dual_frames(captions: Vec<Caption>) -> Vec<Caption> {
    let mut result = Vec::with_capacity(captions.len());
    for mut caption in captions {
        let second = if caption.frames.len() > 1 {
            let frame = caption.frames.remove(1);
            if frame.has_bitmap() {
                Some(Caption {
                    forced: frame.forced(),
                    frames: vec![frame],
                    ..caption.clone()
                })
            } else {
                None
            }
        } else {
            None
        };
        result.push(caption);
        if let Some(second) = second {
            trace!("split second frame from caption at {}ms", second.start);
            result.push(second);
        }
    }
    result
}

/// Should `next` be folded into `last`?
fn is_duplicate(last: &Caption, next: &Caption, gap_ms: u32) -> bool {
    let (Some(a), Some(b), Some(last_end)) =
        (last.frames.first(), next.frames.first(), last.end)
    else {
        return false;
    };
    next.start.abs_diff(last_end) < gap_ms
        && a.coordinates() == b.coordinates()
        && a.chunk_lengths() == b.chunk_lengths()
        && a.same_content(b)
}

/// Collapse runs of identical captions into a single caption spanning all
/// of them.
fn combine_duplicates(captions: Vec<Caption>, gap_ms: u32) -> Vec<Caption> {
    let mut result: Vec<Caption> = Vec::with_capacity(captions.len());
    for caption in captions {
        if let Some(last) = result.last_mut() {
            if is_duplicate(last, &caption, gap_ms) {
                debug!("combining duplicate caption at {}ms", caption.start);
                last.end = caption.end;
                continue;
            }
        }
        result.push(caption);
    }
    result
}
