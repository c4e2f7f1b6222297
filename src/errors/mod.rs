use std::fmt::{Display, Formatter};

use std::error::Error as StdError;
use std::io::Error as IoError;

use lz4_flex::block::DecompressError;

pub type Result<T> = std::result::Result<T, Error>;

/// What a bad cross-reference was pointing at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Bone,
    Slot,
    Skin,
    Ik,
    Transform,
    Path,
    DrawOrder,
}

impl Display for RefKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            RefKind::Bone => f.write_str("bone"),
            RefKind::Slot => f.write_str("slot"),
            RefKind::Skin => f.write_str("skin"),
            RefKind::Ik => f.write_str("ik constraint"),
            RefKind::Transform => f.write_str("transform constraint"),
            RefKind::Path => f.write_str("path constraint"),
            RefKind::DrawOrder => f.write_str("draw order entry"),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Io(IoError),

    Lz4(DecompressError),

    // Envelope header or payload cut short.
    TruncatedStream {
        block: usize,
        needed: usize,
        got: usize,
    },

    // Empty or unrecognized skeleton hash.
    UnsupportedVersion,

    // A NaN float in the image.
    InvalidFloat {
        offset: usize,
    },

    // A section referenced an index that was never decoded.
    IndexOutOfRange {
        kind: RefKind,
        index: i16,
    },

    // Atlas file with fewer than two lines.
    MissingSecondLine,

    // Atlas second line names neither .sct nor .png.
    MissingExtension,
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        Error::Io(err)
    }
}

impl From<DecompressError> for Error {
    fn from(err: DecompressError) -> Error {
        Error::Lz4(err)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Error::Io(ref inner) => inner.fmt(f),
            Error::Lz4(ref inner) => inner.fmt(f),
            Error::TruncatedStream { block, needed, got } => write!(
                f,
                "envelope truncated in block {} (needed {} bytes, got {})",
                block, needed, got
            ),
            Error::UnsupportedVersion => f.write_str("unsupported version: empty skeleton hash"),
            Error::InvalidFloat { offset } => write!(f, "NaN float at offset {}", offset),
            Error::IndexOutOfRange { kind, index } => {
                write!(f, "{} index {} does not resolve", kind, index)
            }
            Error::MissingSecondLine => f.write_str("atlas file has no second line"),
            Error::MissingExtension => f.write_str("atlas second line has no texture extension"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Io(ref inner) => Some(inner),
            Error::Lz4(ref inner) => Some(inner),
            _ => None,
        }
    }
}
