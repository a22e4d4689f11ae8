//! This crate reads Blu-ray subtitles in PGS format, usually found in
//! `*.sup` files extracted from a video container.  PGS subtitles are
//! bitmaps, compressed with a simple run-length encoding and colored using
//! a per-caption YCrCb palette.
//!
//! ## Example code
//!
//! ```no_run
//! extern crate image;
//! extern crate pgssub;
//!
//! let sup = pgssub::SupFile::open("movie.sup").unwrap();
//! for caption in sup.captions() {
//!     println!("#{} {}", caption.index(), caption.srt_timing(0));
//!     println!("Always show: {:?}", caption.forced());
//!     let coords = caption.frames()[0].coordinates();
//!     println!("At: {}, {}", coords.left(), coords.top());
//!     println!("Size: {}x{}", coords.width(), coords.height());
//!     let img: image::RgbaImage = caption.to_image().unwrap();
//!
//!     // You can save or manipulate `img` using the APIs provided by the Rust
//!     // `image` crate.
//! }
//! ```
//!
//! ## Background & References
//!
//! A PGS stream is a sequence of segments.  Each caption ("display set")
//! is made of a presentation segment giving its start time and the objects
//! it shows, window and palette definitions, one or more object segments
//! holding compressed bitmaps, and an end segment.  A display set with no
//! bitmap clears the screen, which is how captions get their end times.
//!
//! - [Presentation Graphic Stream (SUP files) BluRay Subtitle Format](http://blog.thescorpius.com/index.php/2017/07/15/presentation-graphic-stream-sup-files-bluray-subtitle-format/)
//!
//! ## Contributing
//!
//! Your feedback and contributions are welcome!  Please see
//! [GitHub](https://github.com/emk/subtitles-rs) for details.

#![warn(missing_docs)]

#[macro_use]
extern crate log;

mod assemble;
pub mod builder;
mod caption;
mod errors;
pub mod img;
mod palette;
pub mod segment;
mod sup;
mod util;

pub use self::assemble::{assemble, AssembleOptions};
pub use self::caption::{Caption, Coordinates, Frame};
pub use self::errors::{Error, Result};
pub use self::palette::{ycrcb_to_rgb, Palette};
pub use self::sup::{is_sup_file, read_captions, SupFile};
pub use self::util::{srt_time, BytesFormatter};
