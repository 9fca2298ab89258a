//! Error types for the block codec.

use std::io;

use thiserror::Error;

use crate::region::{Dimensions, Offset};

/// Error variants for settings parsing, encoding and decoding.
#[derive(Debug, Error)]
pub enum Error {
    /// Context hash width outside of `1..=16`.
    #[error("context bits must be within 1..=16, got {0}")]
    InvalidContextBits(u8),

    /// More neighbors than a 64-bit context key can hold.
    #[error("at most 4 neighbors are supported, got {0}")]
    TooManyNeighbors(usize),

    /// A neighbor offset that points at a block not yet coded in Y-Z-X order.
    #[error("neighbor offset {0} is not causal")]
    NonCausalNeighbor(Offset),

    /// Settings preamble written by an unknown format revision.
    #[error("unsupported settings version {0}")]
    UnsupportedVersion(u8),

    /// Palette is empty or has more entries than a `BlockId` can address.
    #[error("invalid palette length {0}")]
    InvalidPalette(usize),

    /// Block id that doesn't name a palette entry.
    #[error("block id {id} is outside of the palette ({palette_len} entries)")]
    BlockIdOutOfRange { id: u16, palette_len: usize },

    /// Block buffer doesn't match the declared region dimensions.
    #[error("region holds {actual} blocks, dimensions require {expected}")]
    RegionSizeMismatch { expected: usize, actual: usize },

    /// Region side that doesn't fit the 16-bit dump header.
    #[error("region {0} is too large for a dump header")]
    RegionTooLarge(Dimensions),

    /// Encoded stream is truncated or otherwise damaged.
    #[error("corrupt data: {0}")]
    Corrupt(&'static str),

    /// An I/O error from the underlying stream.
    #[error("io error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        // the coder's reader signals a read past the end of the stream this way
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Self::Corrupt("unexpected end of stream"),
            _ => Self::Io(err),
        }
    }
}

/// A specialized Result type for codec operations.
pub type Result<T> = std::result::Result<T, Error>;
