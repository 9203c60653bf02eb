//! Byte-source abstraction consumed by the demuxer.
//!
//! The demuxer never touches `std::io` or tokio directly — everything goes
//! through [`ByteSource`], which exists in one async shape driven either by
//! a real runtime or by a blocking executor (the blocking adapters never
//! return `Pending`).
//!
//! # Module layout
//!
//! ```text
//! src/source/
//! ├── mod.rs          ← ByteSource trait + re-exports
//! ├── sync.rs         ← SeekableSource / ReadOnlySource (std::io backed)
//! └── nonblocking.rs  ← AsyncSource / AsyncReadOnlySource / SharedSource (tokio backed)
//! ```
//!
//! # Choosing a source
//!
//! | Use case                                  | Source                  |
//! |-------------------------------------------|-------------------------|
//! | Local file, in-memory cursor              | [`SeekableSource`]      |
//! | Forward-only pipe / socket                | [`ReadOnlySource`]      |
//! | tokio file or duplex                      | [`AsyncSource`]         |
//! | tokio stream without seeking              | [`AsyncReadOnlySource`] |
//! | One source shared by two demuxer clones   | [`SharedSource`]        |

pub mod nonblocking;
pub mod sync;

pub use nonblocking::{AsyncReadOnlySource, AsyncSource, SharedSource};
pub use sync::{ReadOnlySource, SeekableSource};

use std::io::{self, SeekFrom};

use async_trait::async_trait;

/// Minimal contract the demuxer needs from a byte stream.
///
/// `read` returning `0` signals source exhaustion. `seek` is only required
/// to succeed when [`can_seek`](ByteSource::can_seek) is `true`; sources
/// without random access report their position from bytes consumed and the
/// demuxer falls back to read-and-discard forward skips.
#[async_trait]
pub trait ByteSource: Send {
    /// Read up to `buf.len()` bytes, returning how many were read.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Move to an absolute position derived from `pos`, returning it.
    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Current byte offset of the source.
    async fn position(&mut self) -> io::Result<u64>;

    /// Whether `seek` may be called.
    fn can_seek(&self) -> bool;

    /// Total length in bytes, when the source knows it.
    fn len(&self) -> Option<u64>;
}

pub(crate) fn seek_unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "source does not support seeking",
    )
}
