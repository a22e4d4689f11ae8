//! Custom pixmaps which can handle kinds of data that the `image` library
//! doesn't support.

use image::{ImageBuffer, Rgba, RgbaImage};
use palette::{FromColor, Hsv, Srgb};
use std::fmt;

use crate::errors::Result;
use crate::geom::Rect;

/// Pixels at or above this intensity count as ink.
pub const INK_THRESHOLD: u8 = 60;

/// Intensities below this are treated as background.
const DARK_CUTOFF: u8 = 30;

/// Empty columns added on each side of a caption, so that glyphs never
/// touch the edge of the image.
pub const PADDING: usize = 10;

/// A fully generic image type, which can hold non-graphical data.
#[derive(Clone, PartialEq)]
pub struct Pixmap<P: Pixel> {
    data: Vec<P>,
    width: usize,
    height: usize,
}

impl<P: Pixel> Pixmap<P> {
    /// Create a new `Pixmap` filled with `P::default()`.
    pub fn blank(width: usize, height: usize) -> Pixmap<P> {
        Pixmap {
            data: vec![P::default(); width * height],
            width,
            height,
        }
    }

    /// Wrap existing row-major pixel data, or return `None` if it has the
    /// wrong length.
    pub fn from_raw(width: usize, height: usize, data: Vec<P>) -> Option<Pixmap<P>> {
        if data.len() == width * height {
            Some(Pixmap { data, width, height })
        } else {
            None
        }
    }

    /// If `x` and `y` do not fit within the pixmap, panic.
    fn bounds_check(&self, x: usize, y: usize) {
        if x >= self.width {
            panic!("out of bounds x: {} width: {}", x, self.width);
        }
        if y >= self.height {
            panic!("out of bounds y: {} height: {}", y, self.height);
        }
    }

    /// The width of the `Pixmap`.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The height of the `Pixmap`.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The raw pixel data, in row-major order.
    pub fn data(&self) -> &[P] {
        &self.data
    }

    /// Get the pixel at `x` and `y`, or panic if out of bounds.
    pub fn get(&self, x: usize, y: usize) -> P {
        self.bounds_check(x, y);
        self.data[y*self.width + x]
    }

    /// Get the pixel at `x` and `y`, or return `P::default()` if out of
    /// bounds.
    pub fn get_default(&self, x: isize, y: isize) -> P {
        match (usize::try_from(x), usize::try_from(y)) {
            (Ok(x), Ok(y)) if x < self.width && y < self.height => {
                self.data[y*self.width + x]
            }
            _ => P::default(),
        }
    }

    /// Get a mutable reference to the pixel at `x` and `y`, or panic if
    /// out of bounds.
    pub fn get_mut(&mut self,  x: usize, y: usize) -> &mut P {
        self.bounds_check(x, y);
        &mut self.data[y*self.width + x]
    }

    /// Render this pixmap as an ordinary RGBA image, for debugging.
    pub fn to_image(&self) -> Result<RgbaImage> {
        let width = cast::u32(self.width)?;
        let height = cast::u32(self.height)?;
        Ok(ImageBuffer::from_fn(width, height, |x, y| {
            self.get(x as usize, y as usize).to_rgba()
        }))
    }
}

impl<P: Pixel> fmt::Debug for Pixmap<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pixmap({}x{})", self.width, self.height)
    }
}

/// Single-channel intensity images, which is what all our segmentation
/// and matching code works with.  Coordinates are signed, and anything
/// outside the image reads as 0.
impl Pixmap<u8> {
    /// Convert a caption to intensities, add padding on the left and
    /// right, and apply the contrast curve.
    pub fn from_caption(image: &RgbaImage, contrast: i32) -> Pixmap<u8> {
        let width = cast::usize(image.width()) + 2 * PADDING;
        let height = cast::usize(image.height());
        let mut pixmap = Pixmap::blank(width, height);
        for (x, y, px) in image.enumerate_pixels() {
            let [r, g, b, a] = px.0;
            let sum = u32::from(r) + u32::from(g) + u32::from(b);
            // At most 765 * 255 / 768, which fits.
            let v = (sum * u32::from(a) / 768) as u8;
            if v >= DARK_CUTOFF {
                *pixmap.get_mut(cast::usize(x) + PADDING, cast::usize(y)) = v;
            }
        }
        if contrast != 0 {
            pixmap.apply_contrast(contrast);
        }
        pixmap
    }

    /// Push intensities towards black and white using a logistic curve.
    pub fn apply_contrast(&mut self, contrast: i32) {
        let factor = 0.5 + f64::from(contrast / 5);
        for v in &mut self.data {
            let arg = (f64::from(*v) - 128.0) * 5.0 / 128.0;
            let r = 256.0 / (1.0 + (-arg * factor).exp());
            *v = r.min(255.0) as u8;
        }
    }

    /// The intensity at `x` and `y`, or 0 outside the image.
    pub fn at(&self, x: i32, y: i32) -> u8 {
        self.get_default(x as isize, y as isize)
    }

    /// Set the intensity at `x` and `y`, ignoring points outside the image.
    pub fn set(&mut self, x: i32, y: i32, v: u8) {
        if let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) {
            if x < self.width && y < self.height {
                self.data[y*self.width + x] = v;
            }
        }
    }

    /// Is the pixel at `x` and `y` ink?
    pub fn is_ink(&self, x: i32, y: i32) -> bool {
        self.at(x, y) >= INK_THRESHOLD
    }

    /// The width as a signed coordinate.
    pub fn w(&self) -> i32 {
        self.width as i32
    }

    /// The height as a signed coordinate.
    pub fn h(&self) -> i32 {
        self.height as i32
    }

    /// Does row `y` contain ink anywhere in `x1..x2`?
    pub fn row_has_ink(&self, y: i32, x1: i32, x2: i32) -> bool {
        (x1..x2).any(|x| self.is_ink(x, y))
    }

    /// How many ink pixels does column `x` have in `y1..y2`?
    pub fn column_ink_count(&self, x: i32, y1: i32, y2: i32) -> i32 {
        (y1..y2).filter(|&y| self.is_ink(x, y)).count() as i32
    }

    /// Does column `x` contain ink anywhere in `y1..y2`?
    pub fn column_has_ink(&self, x: i32, y1: i32, y2: i32) -> bool {
        (y1..y2).any(|y| self.is_ink(x, y))
    }

    /// Copy out the pixels inside `rect`, reading 0 outside the image.
    pub fn crop(&self, rect: &Rect) -> Pixmap<u8> {
        let mut out = Pixmap::blank(rect.width() as usize, rect.height() as usize);
        for y in 0..rect.height() {
            for x in 0..rect.width() {
                out.set(x, y, self.at(rect.left() + x, rect.top() + y));
            }
        }
        out
    }
}

/// A type which can be used as a pixel in a `Pixmap`.
pub trait Pixel: Clone + Copy + fmt::Debug + Default + PartialEq + 'static {
    /// Return a RGBA color for this pixel.  Used for visualizing images
    /// with pixel types that aren't ordinary colors.
    fn to_rgba(self) -> Rgba<u8>;
}

impl Pixel for u8 {
    fn to_rgba(self) -> Rgba<u8> {
        Rgba([self, self, self, 0xff])
    }
}

/// A virtual "pixel" type used to draw how a caption was segmented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SegmentInfo {
    /// Nothing here.
    #[default]
    Background,
    /// Ink that did not end up in any glyph.
    Unassigned,
    /// This pixel belongs to the glyph with the specified ID.
    Id(u16),
}

impl Pixel for SegmentInfo {
    fn to_rgba(self) -> Rgba<u8> {
        // Based on
        // http://martin.ankerl.com/2009/12/09/how-to-create-random-colors-programmatically/
        match self {
            SegmentInfo::Background => Rgba([0, 0, 0, 0xff]),
            SegmentInfo::Unassigned => Rgba([0x80, 0x80, 0x80, 0xff]),
            SegmentInfo::Id(id) => {
                const GOLDEN_RATIO: f32 = 0.618033988749895;
                let hue = ((0.94 + GOLDEN_RATIO*f32::from(id)) % 1.0) * 360.0;
                let hsv: Hsv = Hsv::new(hue, 0.5, 0.95);
                let rgb = Srgb::<f32>::from_color(hsv).into_format::<u8>();
                Rgba([rgb.red, rgb.green, rgb.blue, 0xff])
            }
        }
    }
}
