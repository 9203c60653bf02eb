//! # mkvstream
//!
//! Streaming Matroska/WebM audio demuxer. Pulls one encoded frame of a
//! single selected track per call, without loading the file into memory,
//! over sources that may or may not support random access.
//!
//! The crate does not decode audio — frames come back as the opaque bytes
//! the container carried (Opus packets, Vorbis packets, ...), ready for a
//! decoder or for passthrough.
//!
//! ## Blocking example
//!
//! ```no_run
//! use std::fs::File;
//! use mkvstream::{MatroskaDemuxer, SeekableSource};
//!
//! let file = File::open("audio.webm").unwrap();
//! let source = SeekableSource::new(file).unwrap();
//! let mut demuxer = MatroskaDemuxer::new(source);
//!
//! let mut frame = vec![0u8; 8192];
//! loop {
//!     let n = demuxer.demux_blocking(&mut frame).unwrap();
//!     if n == 0 {
//!         break; // clean end of stream
//!     }
//!     // frame[..n] holds one encoded frame of the selected audio track
//! }
//! ```
//!
//! ## Async example
//!
//! ```no_run
//! use mkvstream::{AsyncSource, MatroskaDemuxer};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let file = tokio::fs::File::open("audio.webm").await?;
//! let source = AsyncSource::new(file).await?;
//! let mut demuxer = MatroskaDemuxer::new(source);
//!
//! let mut frame = vec![0u8; 8192];
//! while demuxer.demux(&mut frame).await? > 0 {
//!     // forward the frame
//! }
//! # Ok(())
//! # }
//! ```

pub mod ebml;
pub mod error;
pub mod matroska;
pub mod source;

pub use ebml::{ElementType, MatroskaElement, VInt, ValueType};
pub use error::{MkvError, Result};
pub use matroska::{
    DemuxerOptions, Lacing, MatroskaAudioSettings, MatroskaBlock, MatroskaDemuxer, MatroskaTrack,
    TrackSelector, TrackType, default_track_selector,
};
pub use source::{
    AsyncReadOnlySource, AsyncSource, ByteSource, ReadOnlySource, SeekableSource, SharedSource,
};

/// EBML magic bytes opening every Matroska/WebM stream.
pub const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// Sniff whether a header starts a Matroska/WebM stream.
///
/// Requires at least 4 bytes; shorter headers are never a match.
pub fn is_matroska(header: &[u8]) -> bool {
    header.starts_with(&EBML_MAGIC)
}
