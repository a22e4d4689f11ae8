//! Run-length encoded image format for PGS subtitles.
//!
//! Each scan line is a sequence of codes:
//!
//! - `CC`: one pixel of color `CC` (non-zero).
//! - `00 00`: end of line.  The rest of the line is color 0.
//! - `00 00LLLLLL`: `L` pixels of color 0.
//! - `00 01LLLLLL LLLLLLLL`: `L` pixels of color 0 (14-bit count).
//! - `00 10LLLLLL CC`: `L` pixels of color `CC`.
//! - `00 11LLLLLL LLLLLLLL CC`: `L` pixels of color `CC` (14-bit count).

use crate::errors::*;
use crate::util::BytesFormatter;

/// The dimensions of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    /// Width in pixels.
    pub w: usize,
    /// Height in pixels.
    pub h: usize,
}

/// The longest run we can express in a single code.
const MAX_RUN: usize = 0x3fff;

/// A cursor over our compressed input.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn next(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos).copied();
        self.pos += 1;
        byte
    }
}

/// Decompress a run-length encoded image, and return a vector in row-major
/// order, starting at the upper-left and scanning right and down, with one
/// palette index per byte.
pub fn decompress(size: Size, data: &[u8]) -> Result<Vec<u8>> {
    trace!("decompressing image {:?} from {:?}", &size, BytesFormatter(data));
    let mut img = vec![0; size.w * size.h];
    let mut input = Reader { data, pos: 0 };
    for y in 0..size.h {
        let row = &mut img[y * size.w..(y + 1) * size.w];
        scan_line(&mut input, row, y, size)?;
    }
    if input.pos < data.len() {
        debug!("{} bytes left over after decompressing image",
               data.len() - input.pos);
    }
    Ok(img)
}

/// Decompress a single scan line into `row`, consuming codes up to and
/// including the end-of-line marker.
fn scan_line(input: &mut Reader, row: &mut [u8], y: usize, size: Size) -> Result<()> {
    let truncated = || Error::BitmapTruncated { row: y, height: size.h };
    let mut x = 0;
    loop {
        let byte = match input.next() {
            Some(byte) => byte,
            // Tolerate a missing end-of-line marker after the last row.
            None if x == size.w && y + 1 == size.h => return Ok(()),
            None => return Err(truncated()),
        };
        let (count, color) = if byte != 0 {
            (1, byte)
        } else {
            let flags = input.next().ok_or_else(truncated)?;
            if flags == 0 {
                // End of line; the remainder is already color 0.
                return Ok(());
            }
            let mut count = usize::from(flags & 0x3f);
            if flags & 0x40 != 0 {
                let low = input.next().ok_or_else(truncated)?;
                count = count << 8 | usize::from(low);
            }
            let color = if flags & 0x80 != 0 {
                input.next().ok_or_else(truncated)?
            } else {
                0
            };
            (count, color)
        };
        if x + count > size.w {
            return Err(Error::LineTooLong { row: y, width: size.w });
        }
        row[x..x + count].fill(color);
        x += count;
    }
}

/// Compress an image in the format read by `decompress`.  Every line ends
/// with an explicit end-of-line marker.
pub fn compress(size: Size, pixels: &[u8]) -> Vec<u8> {
    let mut out = vec![];
    for row in pixels.chunks(size.w.max(1)).take(size.h) {
        let mut x = 0;
        while x < row.len() {
            let color = row[x];
            let mut run = 1;
            while x + run < row.len() && row[x + run] == color && run < MAX_RUN {
                run += 1;
            }
            push_run(&mut out, color, run);
            x += run;
        }
        out.extend_from_slice(&[0, 0]);
    }
    out
}

/// Emit the shortest code for `count` pixels of `color`.
fn push_run(out: &mut Vec<u8>, color: u8, count: usize) {
    // `count` is at most `MAX_RUN`, so these narrowing casts are exact.
    let hi = (count >> 8) as u8;
    let lo = (count & 0xff) as u8;
    match (color, count) {
        (0, 1..=0x3f) => out.extend_from_slice(&[0, lo]),
        (0, _) => out.extend_from_slice(&[0, 0x40 | hi, lo]),
        (c, 1..=2) => out.extend(std::iter::repeat(c).take(count)),
        (c, 3..=0x3f) => out.extend_from_slice(&[0, 0x80 | lo, c]),
        (c, _) => out.extend_from_slice(&[0, 0xc0 | hi, lo, c]),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_every_code_form() {
        let size = Size { w: 80, h: 1 };
        let data = [
            0x05,                   // literal
            0x00, 0x03,             // 3 × color 0
            0x00, 0x84, 0x07,       // 4 × color 7
            0x00, 0x40, 0x40,       // 64 × color 0 (long form)
            0x00, 0xc0, 0x05, 0x09, // 5 × color 9 (long form)
            0x00, 0x00,             // end of line
        ];
        let img = decompress(size, &data).unwrap();
        assert_eq!(img[0], 5);
        assert_eq!(&img[1..4], &[0, 0, 0]);
        assert_eq!(&img[4..8], &[7, 7, 7, 7]);
        assert!(img[8..72].iter().all(|&p| p == 0));
        assert_eq!(&img[72..77], &[9; 5]);
        assert_eq!(&img[77..80], &[0, 0, 0]);
    }

    #[test]
    fn end_of_line_pads_with_zero() {
        let size = Size { w: 4, h: 2 };
        let data = [0x01, 0x00, 0x00, 0x02, 0x02, 0x00, 0x00];
        assert_eq!(decompress(size, &data).unwrap(),
                   vec![1, 0, 0, 0, 2, 2, 0, 0]);
    }

    #[test]
    fn runs_past_row_width_are_rejected() {
        let size = Size { w: 4, h: 1 };
        let data = [0x00, 0x85, 0x01, 0x00, 0x00];
        match decompress(size, &data) {
            Err(Error::LineTooLong { row: 0, width: 4 }) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn truncated_bitmaps_are_rejected() {
        let size = Size { w: 4, h: 2 };
        let data = [0x01, 0x00, 0x00];
        assert!(decompress(size, &data).is_err());
    }

    #[test]
    fn compress_uses_short_codes() {
        let size = Size { w: 16, h: 1 };
        let mut pixels = vec![0; 12];
        pixels.extend_from_slice(&[1, 1, 1, 1]);
        assert_eq!(compress(size, &pixels),
                   vec![0x00, 0x0c, 0x00, 0x84, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn compress_and_decompress_long_runs() {
        let size = Size { w: 300, h: 2 };
        let mut pixels = vec![3; 300];
        pixels.extend(vec![0; 150]);
        pixels.extend(vec![4, 4]);
        pixels.extend(vec![0; 148]);
        let data = compress(size, &pixels);
        assert_eq!(decompress(size, &data).unwrap(), pixels);
    }
}
