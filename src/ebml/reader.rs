//! Positioned element reader over a [`ByteSource`].
//!
//! Owns the source and the demuxer's tracked byte position. Every read goes
//! through [`EbmlReader::read_exact`], which first re-aligns a seekable
//! source to the tracked position — the same source object may be shared or
//! seeked from outside between pulls, and the walk must not silently
//! continue from a foreign offset.

use std::io::SeekFrom;

use bytes::{Bytes, BytesMut};

use crate::ebml::element::{MatroskaElement, ValueType};
use crate::ebml::values;
use crate::ebml::vint::{self, VInt};
use crate::error::{MkvError, Result};
use crate::source::ByteSource;

/// Chunk size for read-and-discard skips on non-seekable sources.
const SKIP_CHUNK: usize = 8 * 1024;

/// Maximum byte width of an element ID VINT.
const MAX_ID_LENGTH: u32 = 4;

/// Streaming EBML reader with exact position tracking.
#[derive(Clone)]
pub struct EbmlReader<S> {
    source: S,
    position: u64,
    scratch: Vec<u8>,
}

impl<S: ByteSource> EbmlReader<S> {
    /// Wrap a source, starting at its current offset.
    pub fn new(source: S) -> EbmlReader<S> {
        EbmlReader {
            source,
            position: 0,
            scratch: Vec::new(),
        }
    }

    /// Tracked byte offset of the next read.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether the underlying source supports random access.
    pub fn can_seek(&self) -> bool {
        self.source.can_seek()
    }

    /// Give the source back, discarding reader state.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Re-align a seekable source with the tracked position.
    async fn resync(&mut self) -> Result<()> {
        if !self.source.can_seek() {
            return Ok(());
        }
        let real = self.source.position().await?;
        if real != self.position {
            self.source.seek(SeekFrom::Start(self.position)).await?;
        }
        Ok(())
    }

    /// Fill `buf` completely or fail with [`MkvError::UnexpectedEndOfStream`].
    ///
    /// The tracked position only advances once the whole buffer is filled,
    /// so a cancelled read is repaired by the next resync on seekable
    /// sources.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.resync().await?;
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.source.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Err(MkvError::UnexpectedEndOfStream {
                    offset: self.position + filled as u64,
                    missing: buf.len() - filled,
                });
            }
            filled += n;
        }
        self.position += buf.len() as u64;
        Ok(())
    }

    /// Read a single byte.
    pub async fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte).await?;
        Ok(byte[0])
    }

    /// Read one VINT off the stream.
    pub async fn read_vint(&mut self) -> Result<VInt> {
        let start = self.position;
        let first = self.read_byte().await?;
        let length = vint::marker_length(first)
            .ok_or(MkvError::MalformedVint { offset: start })? as usize;

        let mut buf = [0u8; 8];
        buf[0] = first;
        if length > 1 {
            self.read_exact(&mut buf[1..length]).await?;
        }
        Ok(VInt::parse(&buf[..length]))
    }

    /// Read the next sibling element header.
    ///
    /// With a `parent`, returns `None` once the parent's payload is
    /// exhausted — the loop-termination signal for child iteration. The
    /// position ends up just past the header; the caller decides whether to
    /// descend into the payload or skip over it.
    pub async fn next_element(
        &mut self,
        parent: Option<&MatroskaElement>,
    ) -> Result<Option<MatroskaElement>> {
        if let Some(parent) = parent {
            if parent.remaining(self.position) <= 0 {
                return Ok(None);
            }
        }

        let start = self.position;
        let id = self.read_vint().await?;
        if id.length() > MAX_ID_LENGTH {
            return Err(MkvError::InvalidElementId { offset: start });
        }
        let size = self.read_vint().await?;

        let element = MatroskaElement::new(
            id.encoded_value() as u32,
            parent.map(|p| p.depth() + 1).unwrap_or(0),
            start,
            id.length() + size.length(),
            size.value(),
        );
        if let Some(parent) = parent {
            if element.end_position() > parent.end_position() {
                return Err(MkvError::InvalidElementSize {
                    id: element.id(),
                    size: element.data_size(),
                });
            }
        }
        Ok(Some(element))
    }

    /// Move to an absolute forward position, seeking when possible and
    /// reading-and-discarding otherwise.
    pub async fn seek_to(&mut self, target: u64) -> Result<()> {
        if target == self.position {
            return Ok(());
        }
        if self.source.can_seek() {
            self.source.seek(SeekFrom::Start(target)).await?;
            self.position = target;
            return Ok(());
        }
        if target < self.position {
            return Err(MkvError::Unsupported(
                "cannot seek backwards on a non-seekable source",
            ));
        }

        if self.scratch.len() < SKIP_CHUNK {
            self.scratch.resize(SKIP_CHUNK, 0);
        }
        let mut left = target - self.position;
        while left > 0 {
            let want = left.min(SKIP_CHUNK as u64) as usize;
            let n = self.source.read(&mut self.scratch[..want]).await?;
            if n == 0 {
                return Err(MkvError::UnexpectedEndOfStream {
                    offset: self.position,
                    missing: left as usize,
                });
            }
            self.position += n as u64;
            left -= n as u64;
        }
        Ok(())
    }

    /// Skip over an element's remaining payload.
    pub async fn skip_element(&mut self, element: &MatroskaElement) -> Result<()> {
        self.seek_to(element.end_position()).await
    }

    /// Read an element's payload into an owned buffer.
    ///
    /// Grows the buffer chunk by chunk, so a corrupt size claims no more
    /// memory than the source actually delivers; when the source length is
    /// known, an overrunning size fails before any allocation.
    pub async fn read_binary_value(&mut self, element: &MatroskaElement) -> Result<Bytes> {
        if let Some(len) = self.source.len() {
            if element.end_position() > len {
                return Err(MkvError::UnexpectedEndOfStream {
                    offset: self.position,
                    missing: (element.end_position() - len) as usize,
                });
            }
        }

        let mut left = element.data_size() as usize;
        let mut data = BytesMut::with_capacity(left.min(SKIP_CHUNK));
        while left > 0 {
            let want = left.min(SKIP_CHUNK);
            let filled = data.len();
            data.resize(filled + want, 0);
            self.read_exact(&mut data[filled..]).await?;
            left -= want;
        }
        Ok(data.freeze())
    }

    /// Read an unsigned integer element, up to 8 bytes wide.
    pub async fn read_unsigned_value(&mut self, element: &MatroskaElement) -> Result<u64> {
        self.require(element, ValueType::UnsignedInteger)?;
        let (buf, n) = self.read_fixed(element).await?;
        Ok(values::read_unsigned_integer(&buf[..n]))
    }

    /// Read a signed integer element, up to 8 bytes wide.
    pub async fn read_signed_value(&mut self, element: &MatroskaElement) -> Result<i64> {
        self.require(element, ValueType::SignedInteger)?;
        let (buf, n) = self.read_fixed(element).await?;
        Ok(values::read_signed_integer(&buf[..n]))
    }

    /// Read a float element (4 or 8 bytes).
    pub async fn read_float_value(&mut self, element: &MatroskaElement) -> Result<f64> {
        self.require(element, ValueType::Float)?;
        let (buf, n) = self.read_fixed(element).await?;
        values::read_float(&buf[..n])
    }

    /// Read a date element.
    pub async fn read_date_value(
        &mut self,
        element: &MatroskaElement,
    ) -> Result<time::OffsetDateTime> {
        self.require(element, ValueType::Date)?;
        let (buf, n) = self.read_fixed(element).await?;
        values::read_date(&buf[..n])
    }

    /// Read an ASCII string element.
    pub async fn read_ascii_value(&mut self, element: &MatroskaElement) -> Result<String> {
        self.require(element, ValueType::AsciiString)?;
        let data = self.read_binary_value(element).await?;
        values::read_ascii_string(&data)
    }

    /// Read a UTF-8 string element.
    pub async fn read_string_value(&mut self, element: &MatroskaElement) -> Result<String> {
        self.require(element, ValueType::Utf8String)?;
        let data = self.read_binary_value(element).await?;
        values::read_utf8_string(&data)
    }

    fn require(&self, element: &MatroskaElement, expected: ValueType) -> Result<()> {
        if element.value_type() != expected {
            return Err(MkvError::UnexpectedValueType {
                id: element.id(),
                expected: match expected {
                    ValueType::Master => "master",
                    ValueType::UnsignedInteger => "unsigned integer",
                    ValueType::SignedInteger => "signed integer",
                    ValueType::Float => "float",
                    ValueType::AsciiString => "ASCII string",
                    ValueType::Utf8String => "UTF-8 string",
                    ValueType::Date => "date",
                    ValueType::Binary => "binary",
                    ValueType::None => "unknown",
                },
            });
        }
        Ok(())
    }

    /// Pull a numeric payload of at most 8 bytes into a stack buffer.
    async fn read_fixed(&mut self, element: &MatroskaElement) -> Result<([u8; 8], usize)> {
        let size = element.data_size() as usize;
        if size > 8 {
            return Err(MkvError::OversizedValue {
                id: element.id(),
                size: element.data_size(),
            });
        }
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf[..size]).await?;
        Ok((buf, size))
    }
}
