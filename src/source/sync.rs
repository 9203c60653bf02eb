//! Blocking adapters backed by `std::io`.
//!
//! Both adapters satisfy the async [`ByteSource`] trait by doing the I/O
//! inline and returning a ready future, so they can be driven by
//! `futures::executor::block_on` without a runtime.

use std::io::{self, Read, Seek, SeekFrom};

use async_trait::async_trait;

use super::{ByteSource, seek_unsupported};

/// A randomly accessible source over any `Read + Seek`, e.g. `File` or
/// `Cursor<Vec<u8>>`.
pub struct SeekableSource<R> {
    inner: R,
    pos: u64,
    len: u64,
}

impl<R: Read + Seek> SeekableSource<R> {
    /// Wrap a seekable reader, measuring its length.
    ///
    /// The reader is rewound to where it was when passed in.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let pos = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(pos))?;
        Ok(Self { inner, pos, len })
    }

    /// Unwrap back into the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[async_trait]
impl<R: Read + Seek + Send> ByteSource for SeekableSource<R> {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = self.inner.seek(pos)?;
        Ok(self.pos)
    }

    async fn position(&mut self) -> io::Result<u64> {
        Ok(self.pos)
    }

    fn can_seek(&self) -> bool {
        true
    }

    fn len(&self) -> Option<u64> {
        Some(self.len)
    }
}

/// A forward-only source over any `Read`, e.g. a pipe or socket.
///
/// Position is reconstructed purely from bytes consumed; `seek` always
/// fails, so the demuxer skips forward by reading and discarding.
pub struct ReadOnlySource<R> {
    inner: R,
    pos: u64,
}

impl<R: Read> ReadOnlySource<R> {
    /// Wrap a forward-only reader.
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    /// Unwrap back into the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[async_trait]
impl<R: Read + Send> ByteSource for ReadOnlySource<R> {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    async fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(seek_unsupported())
    }

    async fn position(&mut self) -> io::Result<u64> {
        Ok(self.pos)
    }

    fn can_seek(&self) -> bool {
        false
    }

    fn len(&self) -> Option<u64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use futures::executor::block_on;

    use super::*;

    #[test]
    fn seekable_tracks_position_and_length() {
        let mut src = SeekableSource::new(Cursor::new(vec![1u8, 2, 3, 4, 5])).unwrap();
        assert_eq!(src.len(), Some(5));
        assert!(src.can_seek());

        let mut buf = [0u8; 2];
        block_on(src.read(&mut buf)).unwrap();
        assert_eq!(buf, [1, 2]);
        assert_eq!(block_on(src.position()).unwrap(), 2);

        block_on(src.seek(SeekFrom::Start(4))).unwrap();
        block_on(src.read(&mut buf)).unwrap();
        assert_eq!(buf[0], 5);
    }

    #[test]
    fn read_only_rejects_seek() {
        let mut src = ReadOnlySource::new(Cursor::new(vec![0u8; 8]));
        assert!(!src.can_seek());
        assert_eq!(src.len(), None);
        let err = block_on(src.seek(SeekFrom::Start(4))).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
