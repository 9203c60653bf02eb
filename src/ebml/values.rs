//! Primitive EBML value decoding.
//!
//! All functions decode from a fixed-size buffer already pulled off the
//! stream — field widths in EBML are given by the element size, not by the
//! value itself. Integers may be 0–8 bytes (zero bytes decodes to zero),
//! floats are exactly 4 or 8, dates exactly 8.

use byteorder::{BigEndian, ByteOrder};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use crate::error::{MkvError, Result};

/// Matroska's date origin, 2001-01-01T00:00:00 UTC.
const DATE_EPOCH: OffsetDateTime = datetime!(2001-01-01 0:00 UTC);

/// Decode a big-endian signed integer, sign-extended from the first byte.
pub fn read_signed_integer(buf: &[u8]) -> i64 {
    let Some((&first, rest)) = buf.split_first() else {
        return 0;
    };
    let mut value = first as i8 as i64;
    for &byte in rest {
        value = (value << 8) | byte as i64;
    }
    value
}

/// Decode a big-endian unsigned integer.
pub fn read_unsigned_integer(buf: &[u8]) -> u64 {
    let mut value = 0u64;
    for &byte in buf {
        value = (value << 8) | byte as u64;
    }
    value
}

/// Decode an IEEE-754 float, single or double precision by width.
pub fn read_float(buf: &[u8]) -> Result<f64> {
    match buf.len() {
        4 => Ok(BigEndian::read_f32(buf) as f64),
        8 => Ok(BigEndian::read_f64(buf)),
        length => Err(MkvError::InvalidFloatLength { length }),
    }
}

/// Decode a date: signed nanoseconds offset from 2001-01-01T00:00:00Z.
pub fn read_date(buf: &[u8]) -> Result<OffsetDateTime> {
    if buf.len() != 8 {
        return Err(MkvError::InvalidDateLength { length: buf.len() });
    }
    let nanos = read_signed_integer(buf);
    Ok(DATE_EPOCH + Duration::nanoseconds(nanos))
}

/// Decode an ASCII string field, trimming trailing NUL padding.
///
/// EBML pads fixed-width string fields with zero bytes. Bytes outside the
/// ASCII range fail with [`MkvError::InvalidStringEncoding`].
pub fn read_ascii_string(buf: &[u8]) -> Result<String> {
    let trimmed = trim_padding(buf);
    if !trimmed.is_ascii() {
        return Err(MkvError::InvalidStringEncoding(
            "non-ASCII byte in ASCII string field".to_string(),
        ));
    }
    Ok(std::str::from_utf8(trimmed)
        .map_err(|e| MkvError::InvalidStringEncoding(e.to_string()))?
        .to_string())
}

/// Decode a UTF-8 string field, trimming trailing NUL padding.
pub fn read_utf8_string(buf: &[u8]) -> Result<String> {
    let trimmed = trim_padding(buf);
    Ok(std::str::from_utf8(trimmed)
        .map_err(|e| MkvError::InvalidStringEncoding(e.to_string()))?
        .to_string())
}

fn trim_padding(buf: &[u8]) -> &[u8] {
    let end = buf
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    &buf[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_sign_extends_from_field_width() {
        assert_eq!(read_signed_integer(&[0xFF]), -1);
        assert_eq!(read_signed_integer(&[0xFF, 0xFF]), -1);
        assert_eq!(read_signed_integer(&[0x80, 0x00]), -32768);
        assert_eq!(read_signed_integer(&[0x00, 0x80]), 128);
        assert_eq!(read_signed_integer(&[]), 0);
    }

    #[test]
    fn unsigned_accumulates_big_endian() {
        assert_eq!(read_unsigned_integer(&[0x01, 0x00]), 256);
        assert_eq!(read_unsigned_integer(&[]), 0);
        assert_eq!(
            read_unsigned_integer(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]),
            u64::MAX
        );
    }

    #[test]
    fn float_widths() {
        let mut quad = [0u8; 4];
        BigEndian::write_f32(&mut quad, 48000.0);
        assert_eq!(read_float(&quad).unwrap(), 48000.0);

        let mut oct = [0u8; 8];
        BigEndian::write_f64(&mut oct, 44100.5);
        assert_eq!(read_float(&oct).unwrap(), 44100.5);

        assert!(matches!(
            read_float(&[0u8; 3]),
            Err(MkvError::InvalidFloatLength { length: 3 })
        ));
    }

    #[test]
    fn date_is_offset_from_2001() {
        let zero = read_date(&[0u8; 8]).unwrap();
        assert_eq!(zero, datetime!(2001-01-01 0:00 UTC));

        // One second past the epoch.
        let mut buf = [0u8; 8];
        BigEndian::write_i64(&mut buf, 1_000_000_000);
        assert_eq!(read_date(&buf).unwrap(), datetime!(2001-01-01 0:00:01 UTC));

        assert!(matches!(
            read_date(&[0u8; 4]),
            Err(MkvError::InvalidDateLength { length: 4 })
        ));
    }

    #[test]
    fn strings_trim_nul_padding() {
        assert_eq!(read_ascii_string(b"A_OPUS\0\0").unwrap(), "A_OPUS");
        assert_eq!(read_utf8_string("né\0".as_bytes()).unwrap(), "né");
        assert!(read_ascii_string("né".as_bytes()).is_err());
        assert!(read_utf8_string(&[0xFF, 0xFE]).is_err());
    }
}
