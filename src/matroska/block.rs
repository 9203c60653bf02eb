//! Block and lacing decoding.
//!
//! A Block/SimpleBlock payload starts with the track number VINT, a 16-bit
//! relative timecode (not modeled here), a flags byte, and, when laced, the
//! per-frame size table. Frame bytes follow; the demuxer pulls them one at
//! a time using the sizes decoded here.

use crate::ebml::element::MatroskaElement;
use crate::ebml::reader::EbmlReader;
use crate::error::{MkvError, Result};
use crate::source::ByteSource;

/// Bits of the flags byte that select the lacing scheme.
const LACE_MASK: u8 = 0b0000_0110;

/// Bias removed from an EBML lace delta VINT, by VINT length.
const LACE_DELTA_BIAS: [i64; 4] = [63, 8191, 1_048_575, 134_217_727];

/// How frames are packed inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lacing {
    /// Single frame, no size table.
    None,
    /// 255-continuation byte sizes.
    Xiph,
    /// All frames the same size.
    FixedSize,
    /// VINT first size, signed VINT deltas after.
    Ebml,
}

impl Lacing {
    fn from_flags(flags: u8) -> Lacing {
        match flags & LACE_MASK {
            0b000 => Lacing::None,
            0b010 => Lacing::Xiph,
            0b100 => Lacing::FixedSize,
            _ => Lacing::Ebml,
        }
    }
}

/// A decoded Block/SimpleBlock, positioned at its first frame byte.
///
/// Invariant: the frame sizes sum to the block's remaining payload at the
/// point the lacing table ended.
#[derive(Debug, Clone)]
pub struct MatroskaBlock {
    track_number: u64,
    lacing: Lacing,
    frame_sizes: Vec<u64>,
}

impl MatroskaBlock {
    /// Track this block belongs to.
    pub fn track_number(&self) -> u64 {
        self.track_number
    }

    /// Lacing scheme the block used.
    pub fn lacing(&self) -> Lacing {
        self.lacing
    }

    /// Number of frames packed in the block, 1–256.
    pub fn frame_count(&self) -> usize {
        self.frame_sizes.len()
    }

    /// Size in bytes of frame `index`.
    pub fn frame_size(&self, index: usize) -> u64 {
        self.frame_sizes[index]
    }

    /// Decode a block header for `selected_track`.
    ///
    /// Returns `None` without touching the lacing bytes when the block
    /// belongs to another track — the caller skips the whole element by its
    /// known size, so decoding the frame layout would be wasted work. On a
    /// match the reader ends up at the first frame byte.
    pub async fn read<S: ByteSource>(
        reader: &mut EbmlReader<S>,
        element: &MatroskaElement,
        selected_track: u64,
    ) -> Result<Option<MatroskaBlock>> {
        let track_number = reader.read_vint().await?.value();
        if track_number != selected_track {
            return Ok(None);
        }

        // Relative timecode, unused by the frame walk.
        let mut timecode = [0u8; 2];
        reader.read_exact(&mut timecode).await?;

        let flags = reader.read_byte().await?;
        let lacing = Lacing::from_flags(flags);

        let frame_count = match lacing {
            Lacing::None => 1,
            // Stored as count - 1, so 1..=256 frames.
            _ => reader.read_byte().await? as usize + 1,
        };

        let frame_sizes = match lacing {
            Lacing::None => vec![block_remaining(reader, element)?],
            Lacing::Xiph => read_xiph_sizes(reader, element, frame_count).await?,
            Lacing::FixedSize => fixed_sizes(reader, element, frame_count)?,
            Lacing::Ebml => read_ebml_sizes(reader, element, frame_count).await?,
        };

        Ok(Some(MatroskaBlock {
            track_number,
            lacing,
            frame_sizes,
        }))
    }
}

/// Payload bytes left in the block at the reader's position.
fn block_remaining<S: ByteSource>(
    reader: &EbmlReader<S>,
    element: &MatroskaElement,
) -> Result<u64> {
    let remaining = element.remaining(reader.position());
    if remaining < 0 {
        return Err(MkvError::InvalidLacing(
            "block data overruns its element".to_string(),
        ));
    }
    Ok(remaining as u64)
}

/// Derive the trailing frame's size from what the explicit sizes left over.
fn last_frame_size(total: u64, explicit: &[u64]) -> Result<u64> {
    let used: u64 = explicit.iter().sum();
    total.checked_sub(used).ok_or_else(|| {
        MkvError::InvalidLacing("laced frame sizes exceed block size".to_string())
    })
}

async fn read_xiph_sizes<S: ByteSource>(
    reader: &mut EbmlReader<S>,
    element: &MatroskaElement,
    frame_count: usize,
) -> Result<Vec<u64>> {
    let mut sizes = Vec::with_capacity(frame_count);
    for _ in 0..frame_count - 1 {
        // Classic 255-continuation: bytes accumulate while they read 255.
        let mut size = 0u64;
        loop {
            let byte = reader.read_byte().await?;
            size += byte as u64;
            if byte != 255 {
                break;
            }
        }
        sizes.push(size);
    }

    let total = block_remaining(reader, element)?;
    sizes.push(last_frame_size(total, &sizes)?);
    Ok(sizes)
}

fn fixed_sizes<S: ByteSource>(
    reader: &EbmlReader<S>,
    element: &MatroskaElement,
    frame_count: usize,
) -> Result<Vec<u64>> {
    let total = block_remaining(reader, element)?;
    if total % frame_count as u64 != 0 {
        return Err(MkvError::InvalidLacing(format!(
            "fixed-size lacing: {total} bytes do not divide into {frame_count} frames"
        )));
    }
    Ok(vec![total / frame_count as u64; frame_count])
}

async fn read_ebml_sizes<S: ByteSource>(
    reader: &mut EbmlReader<S>,
    element: &MatroskaElement,
    frame_count: usize,
) -> Result<Vec<u64>> {
    let mut sizes: Vec<u64> = Vec::with_capacity(frame_count);
    for _ in 0..frame_count - 1 {
        let vint = reader.read_vint().await?;
        let size = match sizes.last() {
            // First size is a plain unsigned VINT.
            None => vint.value(),
            // Later sizes are deltas, biased by the VINT's encoded width.
            Some(&previous) => {
                if vint.length() > 4 {
                    return Err(MkvError::InvalidLacing(format!(
                        "EBML lace delta VINT of {} bytes, max is 4",
                        vint.length()
                    )));
                }
                let delta = vint.value() as i64 - LACE_DELTA_BIAS[vint.length() as usize - 1];
                let next = previous as i64 + delta;
                if next < 0 {
                    return Err(MkvError::InvalidLacing(
                        "EBML lace delta yields negative frame size".to_string(),
                    ));
                }
                next as u64
            }
        };
        sizes.push(size);
    }

    let total = block_remaining(reader, element)?;
    sizes.push(last_frame_size(total, &sizes)?);
    Ok(sizes)
}
