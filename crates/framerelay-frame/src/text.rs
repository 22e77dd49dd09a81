//! UTF-32LE text codec.
//!
//! Relay payloads are text encoded as little-endian UTF-32 code units, four
//! bytes per scalar value.

use crate::error::{FrameError, Result};

/// Bytes per UTF-32 code unit.
pub const UNIT_SIZE: usize = 4;

/// Encode text as UTF-32LE bytes.
pub fn encode_utf32(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.chars().count() * UNIT_SIZE);
    for ch in text.chars() {
        out.extend_from_slice(&(ch as u32).to_le_bytes());
    }
    out
}

/// Decode UTF-32LE bytes into text.
///
/// Fails if the length is not a multiple of four or a code unit is not a
/// valid Unicode scalar value; `offset` in the error points at the offending
/// unit.
pub fn decode_utf32(bytes: &[u8]) -> Result<String> {
    if bytes.len() % UNIT_SIZE != 0 {
        return Err(FrameError::InvalidUtf32 {
            offset: bytes.len() - bytes.len() % UNIT_SIZE,
        });
    }

    let mut out = String::with_capacity(bytes.len() / UNIT_SIZE);
    for (i, unit) in bytes.chunks_exact(UNIT_SIZE).enumerate() {
        let value = u32::from_le_bytes(unit.try_into().unwrap());
        let ch = char::from_u32(value).ok_or(FrameError::InvalidUtf32 {
            offset: i * UNIT_SIZE,
        })?;
        out.push(ch);
    }
    Ok(out)
}
