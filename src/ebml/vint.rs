//! Variable-length integer (VINT) codec.
//!
//! EBML VINTs use the leading zero bits of the first byte as a length
//! marker:
//!
//! ```text
//! 1xxxxxxx                            1 byte,  7 bits of data
//! 01xxxxxx xxxxxxxx                   2 bytes, 14 bits
//! 001xxxxx xxxxxxxx xxxxxxxx          3 bytes, 21 bits
//! ...down to...
//! 00000001 xxxxxxxx (×7)              8 bytes, 56 bits
//! ```
//!
//! Element IDs keep the marker bits (IDs are distinguished by their full
//! encoded pattern); sizes and other values use the masked payload.

/// Maximum VINT length in bytes.
pub const MAX_VINT_LENGTH: u32 = 8;

/// A decoded EBML variable-length integer.
///
/// Carries both the raw encoded bits (used for element IDs and EBML lace
/// deltas) and the masked payload value (used for sizes and counts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VInt {
    encoded_value: u64,
    length: u32,
    value: u64,
}

impl VInt {
    /// Number of bytes this VINT occupied in the stream, 1–8.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// The raw bits as read, length marker included.
    pub fn encoded_value(&self) -> u64 {
        self.encoded_value
    }

    /// The payload with the length marker masked out.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Decode a VINT from a buffer holding exactly its bytes.
    ///
    /// The buffer length must match the marker in `buf[0]` (see
    /// [`marker_length`]); callers read the first byte, size the buffer,
    /// then hand it here.
    pub fn parse(buf: &[u8]) -> VInt {
        debug_assert_eq!(marker_length(buf[0]), Some(buf.len() as u32));

        let mut encoded = 0u64;
        for &byte in buf {
            encoded = (encoded << 8) | byte as u64;
        }

        let length = buf.len() as u32;
        VInt {
            encoded_value: encoded,
            length,
            value: encoded & payload_mask(length),
        }
    }
}

/// Length in bytes encoded by a VINT's first byte, or `None` when the byte
/// is zero (marker bit beyond 8 bytes — a corrupt encoding).
pub fn marker_length(first_byte: u8) -> Option<u32> {
    if first_byte == 0 {
        return None;
    }
    Some(first_byte.leading_zeros() + 1)
}

/// Mask keeping the low `7 * length` payload bits.
pub fn payload_mask(length: u32) -> u64 {
    (1u64 << (7 * length)) - 1
}

/// Encode `value` into the shortest VINT that can hold it.
///
/// Returns the bytes and the length. Used by tests and fixture writers; the
/// demuxer itself only decodes.
pub fn encode(value: u64) -> ([u8; 8], u32) {
    let mut length = 1;
    while length < MAX_VINT_LENGTH && value >= payload_mask(length) {
        // The all-ones payload is reserved (unknown size), so bump early.
        length += 1;
    }
    encode_with_length(value, length)
}

/// Encode `value` as a VINT of exactly `length` bytes.
///
/// `value` must fit in `7 * length` bits. EBML lacing needs this because
/// lace deltas are biased by their encoded width.
pub fn encode_with_length(value: u64, length: u32) -> ([u8; 8], u32) {
    debug_assert!(length >= 1 && length <= MAX_VINT_LENGTH);
    debug_assert!(value <= payload_mask(length));

    let marker = 1u64 << (7 * length);
    let encoded = marker | value;

    let mut bytes = [0u8; 8];
    let mut v = encoded;
    for i in (0..length as usize).rev() {
        bytes[i] = (v & 0xFF) as u8;
        v >>= 8;
    }
    (bytes, length)
}
