//! WAL entry encoding/decoding with CRC32 checksums
//!
//! ## Frame Format
//!
//! ```text
//! ┌──────────────┬──────────────┬───────────────────────────┐
//! │ len: u32 LE  │ crc32: u32 LE│ payload (MessagePack)     │
//! └──────────────┴──────────────┴───────────────────────────┘
//! ```
//!
//! `len` counts payload bytes only; the checksum covers the payload.

use crate::wal::WalEntry;
use berth_core::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Bytes before the payload
pub const ENTRY_HEADER_SIZE: usize = 8;

/// Upper bound on a single payload; larger lengths are treated as corruption
pub const MAX_ENTRY_SIZE: usize = 16 * 1024 * 1024;

/// Why a frame could not be decoded
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer ends mid-frame (torn write)
    #[error("incomplete entry: need {needed} bytes, have {have}")]
    Incomplete {
        /// Bytes available
        have: usize,
        /// Bytes the frame needs
        needed: usize,
    },

    /// Payload does not match its checksum
    #[error("checksum mismatch: expected {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch {
        /// Stored checksum
        expected: u32,
        /// Checksum of the bytes read
        actual: u32,
    },

    /// Declared length exceeds [`MAX_ENTRY_SIZE`]
    #[error("entry length {0} exceeds limit")]
    Oversized(usize),

    /// Checksum matched but the payload is not a valid entry
    #[error("invalid payload: {0}")]
    Payload(String),
}

/// Encode an entry into a checksummed frame
pub fn encode_entry(entry: &WalEntry) -> Result<Vec<u8>> {
    let payload =
        rmp_serde::to_vec_named(entry).map_err(|e| Error::Serialization(e.to_string()))?;
    if payload.len() > MAX_ENTRY_SIZE {
        return Err(Error::Serialization(format!(
            "entry of {} bytes exceeds limit",
            payload.len()
        )));
    }

    let mut frame = vec![0u8; ENTRY_HEADER_SIZE + payload.len()];
    LittleEndian::write_u32(&mut frame[0..4], payload.len() as u32);
    LittleEndian::write_u32(&mut frame[4..8], crc32fast::hash(&payload));
    frame[ENTRY_HEADER_SIZE..].copy_from_slice(&payload);
    Ok(frame)
}

/// Decode one frame from the start of `buf`
///
/// Returns the entry and the number of bytes consumed.
pub fn decode_entry(buf: &[u8]) -> std::result::Result<(WalEntry, usize), DecodeError> {
    if buf.len() < ENTRY_HEADER_SIZE {
        return Err(DecodeError::Incomplete {
            have: buf.len(),
            needed: ENTRY_HEADER_SIZE,
        });
    }

    let len = LittleEndian::read_u32(&buf[0..4]) as usize;
    if len > MAX_ENTRY_SIZE {
        return Err(DecodeError::Oversized(len));
    }

    let total = ENTRY_HEADER_SIZE + len;
    if buf.len() < total {
        return Err(DecodeError::Incomplete {
            have: buf.len(),
            needed: total,
        });
    }

    let expected = LittleEndian::read_u32(&buf[4..8]);
    let payload = &buf[ENTRY_HEADER_SIZE..total];
    let actual = crc32fast::hash(payload);
    if expected != actual {
        return Err(DecodeError::ChecksumMismatch { expected, actual });
    }

    let entry = rmp_serde::from_slice(payload).map_err(|e| DecodeError::Payload(e.to_string()))?;
    Ok((entry, total))
}
