//! Error types for subtitle recognition.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Something went wrong while segmenting or recognizing a caption.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caption image could not be split into lines and glyphs.
    #[error("could not segment caption: {message}")]
    Segmentation { message: String },

    /// A glyph could not be matched against any font, and the caller asked
    /// to be told about it so it can get a label from the user.
    #[error("caption {caption} contains an unknown symbol")]
    UnknownSymbol { caption: usize },

    /// There is no reference font with this name.
    #[error("no font database named {name:?}")]
    UnknownTarget { name: String },

    /// A font database on disk could not be parsed.
    #[error("corrupt font file {}: {message}", path.display())]
    CorruptFontFile { path: PathBuf, message: String },

    /// We could not read or write a file.
    #[error("could not access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("could not parse configuration {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// We could not write a debug image.
    #[error("could not write image {}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A numeric conversion overflowed.
    #[error(transparent)]
    Cast(#[from] cast::Error),
}

impl Error {
    /// Build a segmentation error.
    pub(crate) fn segmentation<S: Into<String>>(message: S) -> Error {
        Error::Segmentation { message: message.into() }
    }

    /// Build an `Io` error for `path`.
    pub(crate) fn io<P: Into<PathBuf>>(path: P, source: io::Error) -> Error {
        Error::Io { path: path.into(), source }
    }
}

/// A result type using our `Error`.
pub type Result<T, E = Error> = std::result::Result<T, E>;
