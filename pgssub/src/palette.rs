//! Caption palettes, stored as YCrCb in the stream and converted to RGBA.

use cast;
use image::Rgba;

/// Convert a single studio-swing YCrCb color to RGB, using the ITU-R
/// BT.601 matrix.
pub fn ycrcb_to_rgb(y: u8, cr: u8, cb: u8) -> [u8; 3] {
    let y = f64::from(y) - 16.0;
    let cr = f64::from(cr) - 128.0;
    let cb = f64::from(cb) - 128.0;

    let r = 1.1644 * y + 1.596 * cr;
    let g = 1.1644 * y - 0.813 * cr - 0.391 * cb;
    let b = 1.1644 * y + 2.018 * cb;
    [clamp_channel(r), clamp_channel(g), clamp_channel(b)]
}

/// Round `v` and clamp it to a valid color channel.
fn clamp_channel(v: f64) -> u8 {
    cast::u8(v.round().clamp(0.0, 255.0)).unwrap_or(0)
}

/// A 256-entry palette of RGBA colors.  Entries which are never defined
/// are fully transparent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<Rgba<u8>>,
}

impl Default for Palette {
    fn default() -> Palette {
        Palette {
            entries: vec![Rgba([0, 0, 0, 0]); 256],
        }
    }
}

impl Palette {
    /// Define palette entry `index` from the YCrCb values and alpha found
    /// in a palette segment.
    pub fn set_ycrcb(&mut self, index: u8, y: u8, cr: u8, cb: u8, alpha: u8) {
        let [r, g, b] = ycrcb_to_rgb(y, cr, cb);
        self.entries[usize::from(index)] = Rgba([r, g, b, alpha]);
    }

    /// Look up a color.
    pub fn get(&self, index: u8) -> Rgba<u8> {
        self.entries[usize::from(index)]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn converts_studio_black_and_white() {
        assert_eq!(ycrcb_to_rgb(16, 128, 128), [0, 0, 0]);
        assert_eq!(ycrcb_to_rgb(235, 128, 128), [255, 255, 255]);
    }

    #[test]
    fn clamps_out_of_range_colors() {
        // Strong red chroma at full luma overflows the red channel.
        let [r, _, b] = ycrcb_to_rgb(235, 240, 16);
        assert_eq!(r, 255);
        assert_eq!(b, 29);
        assert_eq!(ycrcb_to_rgb(0, 128, 128), [0, 0, 0]);
    }

    #[test]
    fn undefined_entries_are_transparent() {
        let mut palette = Palette::default();
        palette.set_ycrcb(1, 235, 128, 128, 255);
        assert_eq!(palette.get(0), Rgba([0, 0, 0, 0]));
        assert_eq!(palette.get(1), Rgba([255, 255, 255, 255]));
    }
}
