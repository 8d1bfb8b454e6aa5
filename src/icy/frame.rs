//! ICY frame geometry
//!
//! Locates the first metadata block inside a buffer that starts at the first
//! byte of the response body.

use thiserror::Error;

/// Length codes are multiplied by this to get the block size in bytes
pub const METADATA_BLOCK_UNIT: usize = 16;
/// Largest block a single length byte can announce (255 * 16)
pub const MAX_METADATA_BLOCK_LEN: usize = u8::MAX as usize * METADATA_BLOCK_UNIT;

/// Where the metadata block sits in the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockGeometry {
    /// The length byte at offset `metaint` has not arrived
    Incomplete,
    /// Length code 0: no metadata this cycle
    Empty,
    /// Block occupies `start..start + len`
    Block { start: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("metadata block declares {declared} bytes but only {available} arrived")]
    ShortBlock { declared: usize, available: usize },
}

/// Parse the `icy-metaint` header value.
///
/// Absent, non-numeric, zero and negative values all mean "no metadata".
pub fn parse_metaint(value: Option<&str>) -> Option<usize> {
    value?
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|&interval| interval > 0)
}

/// Read the length code that follows `metaint` bytes of audio
pub fn locate_block(buffer: &[u8], metaint: usize) -> BlockGeometry {
    match buffer.get(metaint) {
        None => BlockGeometry::Incomplete,
        Some(0) => BlockGeometry::Empty,
        Some(&code) => BlockGeometry::Block {
            start: metaint + 1,
            len: usize::from(code) * METADATA_BLOCK_UNIT,
        },
    }
}

/// Slice the raw block out of the buffer.
///
/// A buffer shorter than the declared geometry is an error, never a
/// silently truncated block.
pub fn block_bytes(buffer: &[u8], start: usize, len: usize) -> Result<&[u8], FrameError> {
    buffer
        .get(start..start + len)
        .ok_or(FrameError::ShortBlock {
            declared: len,
            available: buffer.len().saturating_sub(start),
        })
}
