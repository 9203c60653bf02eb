//! Demuxer error types.
//!
//! Errors fall into four groups: structural (the container is not laid out
//! the way Matroska requires), encoding (a binary field could not be
//! decoded), I/O (the byte source failed or ended mid-field), and usage
//! (the caller asked for something the demuxer does not support).

use thiserror::Error;

/// Errors produced while demuxing a Matroska/WebM stream.
#[derive(Error, Debug)]
pub enum MkvError {
    /// The stream does not start with an EBML header element.
    #[error("Missing EBML header at start of stream")]
    MissingEbmlHeader,

    /// No Segment element follows the EBML header.
    #[error("Missing Segment element after EBML header")]
    MissingSegment,

    /// An element value was read with the wrong type for its ID.
    #[error("Element 0x{id:08X} is not a {expected} element")]
    UnexpectedValueType {
        /// The element ID that was read.
        id: u32,
        /// The value type the caller required.
        expected: &'static str,
    },

    /// The track selector returned a track number that matches no track.
    #[error("Track selector chose track {track_number}, which does not exist")]
    TrackSelectionFailed {
        /// The track number the selector returned.
        track_number: u64,
    },

    /// A VINT's first byte carried no length marker bit.
    #[error("Malformed VINT at offset {offset}: no length marker within 8 bytes")]
    MalformedVint {
        /// Byte offset of the first VINT byte.
        offset: u64,
    },

    /// An element ID VINT was longer than the 4 bytes EBML allows.
    #[error("Invalid element ID at offset {offset}")]
    InvalidElementId {
        /// Byte offset of the ID's first byte.
        offset: u64,
    },

    /// A float field was not 4 or 8 bytes wide.
    #[error("Invalid float length {length}, must be 4 or 8 bytes")]
    InvalidFloatLength {
        /// The offending field width.
        length: usize,
    },

    /// A date field was not exactly 8 bytes wide.
    #[error("Invalid date length {length}, must be 8 bytes")]
    InvalidDateLength {
        /// The offending field width.
        length: usize,
    },

    /// A numeric element was wider than the 8 bytes that fit an integer.
    #[error("Element 0x{id:08X} has a {size}-byte numeric value, max is 8")]
    OversizedValue {
        /// The element ID whose value was oversized.
        id: u32,
        /// The declared payload size.
        size: u64,
    },

    /// An element declared a payload that overruns its parent element.
    #[error("Element 0x{id:08X} declares {size} payload bytes, overrunning its parent")]
    InvalidElementSize {
        /// The element ID carrying the bad size.
        id: u32,
        /// The declared payload size.
        size: u64,
    },

    /// A string field held bytes that do not decode as text.
    #[error("Invalid string encoding: {0}")]
    InvalidStringEncoding(String),

    /// A block's lacing data could not be decoded.
    #[error("Invalid lacing: {0}")]
    InvalidLacing(String),

    /// The source ended while a fixed-size field was still incomplete.
    #[error("Unexpected end of stream at offset {offset} ({missing} bytes missing)")]
    UnexpectedEndOfStream {
        /// Position where the short read happened.
        offset: u64,
        /// Bytes still owed by the source.
        missing: usize,
    },

    /// The caller's buffer cannot hold the next frame.
    #[error("Frame of {needed} bytes does not fit caller buffer of {capacity}")]
    FrameBufferTooSmall {
        /// Size of the frame about to be emitted.
        needed: usize,
        /// Length of the buffer the caller supplied.
        capacity: usize,
    },

    /// A seek was requested that the source or demuxer cannot perform.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// A previous error left the parse state unusable.
    #[error("Demuxer is poisoned by an earlier error, create a new instance")]
    Poisoned,

    /// I/O error from the byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MkvError {
    /// Whether this error poisons the demuxer.
    ///
    /// Usage errors leave the parse state untouched and may be retried;
    /// everything else means the stream position or state can no longer be
    /// trusted.
    pub(crate) fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MkvError::Unsupported(_) | MkvError::FrameBufferTooSmall { .. } | MkvError::Poisoned
        )
    }
}

/// Result type for demuxer operations.
pub type Result<T> = std::result::Result<T, MkvError>;
