//! Length-prefixed frame carrying two independently sized sub-buffers.
//!
//! ```text
//! +----------+----------+-----------+-----------+
//! | Lx (4 B) | Ly (4 B) | x (Lx B)  | y (Ly B)  |
//! +----------+----------+-----------+-----------+
//! ```
//!
//! Both lengths are big-endian and the frame is exactly `8 + Lx + Ly` bytes.

use crate::error::{FrameDecodeError, FrameEncodeError};

/// Size of the two length prefixes
pub const HEADER_LEN: usize = 8;

/// Encodes two buffers into a fresh paired frame
///
/// # Example
///
/// ```
/// use partagg::frame;
///
/// let bytes = frame::encode(b"ab", b"").unwrap();
/// assert_eq!(bytes, [0, 0, 0, 2, 0, 0, 0, 0, b'a', b'b']);
/// assert_eq!(frame::decode(&bytes).unwrap(), (b"ab".to_vec(), Vec::new()));
/// ```
pub fn encode(x: &[u8], y: &[u8]) -> Result<Vec<u8>, FrameEncodeError> {
    let mut out = Vec::with_capacity(HEADER_LEN + x.len() + y.len());
    encode_into(x, y, &mut out)?;
    Ok(out)
}

/// Encodes two buffers into `out`, replacing its contents
///
/// Lets a caller reuse one scratch allocation across many frames. Fails without
/// touching `out` if either buffer is longer than `i32::MAX` bytes.
pub fn encode_into(x: &[u8], y: &[u8], out: &mut Vec<u8>) -> Result<(), FrameEncodeError> {
    let lx = prefix(x.len())?;
    let ly = prefix(y.len())?;
    out.clear();
    out.reserve(HEADER_LEN + x.len() + y.len());
    out.extend_from_slice(&lx);
    out.extend_from_slice(&ly);
    out.extend_from_slice(x);
    out.extend_from_slice(y);
    Ok(())
}

fn prefix(len: usize) -> Result<[u8; 4], FrameEncodeError> {
    i32::try_from(len)
        .map(i32::to_be_bytes)
        .map_err(|_| FrameEncodeError::Oversized(len))
}

/// Splits a paired frame into owned copies of its two sub-buffers
pub fn decode(frame: &[u8]) -> Result<(Vec<u8>, Vec<u8>), FrameDecodeError> {
    let (x, y) = split(frame)?;
    Ok((x.to_vec(), y.to_vec()))
}

/// Splits a paired frame into borrowed views of its two sub-buffers
pub fn split(frame: &[u8]) -> Result<(&[u8], &[u8]), FrameDecodeError> {
    let Some((header, body)) = frame.split_first_chunk::<HEADER_LEN>() else {
        return Err(FrameDecodeError::Truncated {
            len: frame.len(),
            min: HEADER_LEN,
        });
    };
    let lx = length(&header[..4])?;
    let ly = length(&header[4..])?;
    let expected = HEADER_LEN as u64 + lx as u64 + ly as u64;
    if expected != frame.len() as u64 {
        return Err(FrameDecodeError::LengthMismatch {
            expected,
            actual: frame.len(),
        });
    }
    Ok(body.split_at(lx))
}

fn length(bytes: &[u8]) -> Result<usize, FrameDecodeError> {
    let raw = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    usize::try_from(raw).map_err(|_| FrameDecodeError::NegativeLength(raw))
}
