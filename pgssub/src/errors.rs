//! Custom `Error` and `Result` types.

use std::io;
use std::path::PathBuf;
use std::result;
use thiserror::Error;

/// Our standard result type.
pub type Result<T, E = Error> = result::Result<T, E>;

/// Errors which can be returned by this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The input does not start with a `PG` segment header.
    #[error("input is not a PGS subtitle stream")]
    NotSupStream,

    /// Our input data ended in the middle of a segment.
    #[error("input ended unexpectedly at offset 0x{offset:x}")]
    #[non_exhaustive]
    Truncated {
        /// Offset of the segment we were reading.
        offset: usize,
    },

    /// We found a segment type that we don't know how to decode.
    #[error("unknown segment type 0x{kind:02x} at offset 0x{offset:x}")]
    #[non_exhaustive]
    UnknownSegment {
        /// The segment type byte.
        kind: u8,
        /// Offset of the segment header.
        offset: usize,
    },

    /// A segment declared a length which is impossible for its type.
    #[error("segment 0x{kind:02x} at offset 0x{offset:x} has bad length {length}")]
    #[non_exhaustive]
    BadLength {
        /// The segment type byte.
        kind: u8,
        /// The declared body length.
        length: usize,
        /// Offset of the segment header.
        offset: usize,
    },

    /// Window definitions must contain one or two windows.
    #[error("window definition contains {count} windows")]
    #[non_exhaustive]
    WindowCount {
        /// The number of windows declared.
        count: u8,
    },

    /// Palette segments hold a 2-byte header and 5-byte entries.
    #[error("palette segment has bad length {length}")]
    #[non_exhaustive]
    PaletteLength {
        /// The declared body length.
        length: usize,
    },

    /// An object segment had neither its "first" nor its "last" flag set.
    #[error("unexpected object continuation flags 0x{flags:02x} at offset 0x{offset:x}")]
    #[non_exhaustive]
    UnexpectedContinuation {
        /// The raw flags byte.
        flags: u8,
        /// Offset of the segment header.
        offset: usize,
    },

    /// We saw a second "first" segment for an object we're still reading.
    #[error("duplicate object segment at offset 0x{offset:x}")]
    #[non_exhaustive]
    DuplicateSegment {
        /// Offset of the segment header.
        offset: usize,
    },

    /// We saw a "last" segment with no preceding "first" segment.
    #[error("object continuation without a first segment at offset 0x{offset:x}")]
    #[non_exhaustive]
    OrphanSegment {
        /// Offset of the segment header.
        offset: usize,
    },

    /// An object may be split across at most two segments.
    #[error("object split into more than two segments at offset 0x{offset:x}")]
    #[non_exhaustive]
    TooManySegments {
        /// Offset of the segment header.
        offset: usize,
    },

    /// A caption may contain at most two objects.
    #[error("too many objects in caption at offset 0x{offset:x}")]
    #[non_exhaustive]
    TooManyObjects {
        /// Offset of the segment header.
        offset: usize,
    },

    /// A run in the compressed bitmap extends past the end of a row.
    #[error("row {row} of bitmap is longer than {width} pixels")]
    #[non_exhaustive]
    LineTooLong {
        /// The row being decoded.
        row: usize,
        /// The declared bitmap width.
        width: usize,
    },

    /// The compressed bitmap ended before the image was complete.
    #[error("bitmap data ended at row {row} of {height}")]
    #[non_exhaustive]
    BitmapTruncated {
        /// The row being decoded.
        row: usize,
        /// The declared bitmap height.
        height: usize,
    },

    /// We could not read a file.
    #[error("could not read {}", path.display())]
    #[non_exhaustive]
    Io {
        /// The file we were reading.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
}

impl Error {
    /// Is this error caused by malformed subtitle data, rather than by the
    /// environment?  Format errors will happen again if we retry.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, Error::Io { .. })
    }
}

#[test]
fn io_errors_are_not_format_errors() {
    let err = Error::Io {
        path: PathBuf::from("x.sup"),
        source: io::Error::new(io::ErrorKind::NotFound, "missing"),
    };
    assert!(!err.is_format_error());
    assert!(Error::Truncated { offset: 3 }.is_format_error());
}
