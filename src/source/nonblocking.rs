//! tokio-backed adapters and the shared-source wrapper.

use std::io::{self, SeekFrom};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tokio::sync::Mutex;

use super::{ByteSource, seek_unsupported};

/// A randomly accessible source over tokio's `AsyncRead + AsyncSeek`,
/// e.g. `tokio::fs::File`.
pub struct AsyncSource<R> {
    inner: R,
    pos: u64,
    len: u64,
}

impl<R: AsyncRead + AsyncSeek + Unpin> AsyncSource<R> {
    /// Wrap an async seekable reader, measuring its length.
    ///
    /// The reader is rewound to where it was when passed in.
    pub async fn new(mut inner: R) -> io::Result<Self> {
        let pos = inner.stream_position().await?;
        let len = inner.seek(SeekFrom::End(0)).await?;
        inner.seek(SeekFrom::Start(pos)).await?;
        Ok(Self { inner, pos, len })
    }

    /// Unwrap back into the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[async_trait]
impl<R: AsyncRead + AsyncSeek + Unpin + Send> ByteSource for AsyncSource<R> {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf).await?;
        self.pos += n as u64;
        Ok(n)
    }

    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = self.inner.seek(pos).await?;
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

/// A forward-only async source, e.g. a network stream.
pub struct AsyncReadOnlySource<R> {
    inner: R,
    pos: u64,
}

impl<R: AsyncRead + Unpin> AsyncReadOnlySource<R> {
    /// Wrap a forward-only async reader.
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> ByteSource for AsyncReadOnlySource<R> {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf).await?;
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

/// A clonable handle to one underlying source.
///
/// Used when a demuxer is [cloned](crate::MatroskaDemuxer::try_clone): both
/// instances hold a handle, the bytes live once. Callers must still serialize
/// their pulls — the mutex keeps individual reads atomic, not whole frames.
pub struct SharedSource<S> {
    inner: Arc<Mutex<S>>,
    can_seek: bool,
    len: Option<u64>,
}

impl<S: ByteSource> SharedSource<S> {
    /// Move a source behind a shared handle.
    pub fn new(source: S) -> Self {
        let can_seek = source.can_seek();
        let len = source.len();
        Self {
            inner: Arc::new(Mutex::new(source)),
            can_seek,
            len,
        }
    }
}

impl<S> Clone for SharedSource<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            can_seek: self.can_seek,
            len: self.len,
        }
    }
}

#[async_trait]
impl<S: ByteSource> ByteSource for SharedSource<S> {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.lock().await.read(buf).await
    }

    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.lock().await.seek(pos).await
    }

    async fn position(&mut self) -> io::Result<u64> {
        self.inner.lock().await.position().await
    }

    fn can_seek(&self) -> bool {
        self.can_seek
    }

    fn len(&self) -> Option<u64> {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::source::SeekableSource;

    use super::*;

    #[tokio::test]
    async fn shared_source_handles_see_the_same_bytes() {
        let base = SeekableSource::new(Cursor::new(vec![9u8, 8, 7, 6])).unwrap();
        let mut a = SharedSource::new(base);
        let mut b = a.clone();

        let mut buf = [0u8; 2];
        a.read(&mut buf).await.unwrap();
        assert_eq!(buf, [9, 8]);

        // The clone continues where the first handle stopped.
        b.read(&mut buf).await.unwrap();
        assert_eq!(buf, [7, 6]);
        assert_eq!(b.len(), Some(4));
    }
}
