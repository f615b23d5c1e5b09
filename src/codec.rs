//! Segment Codec
//!
//! Self-delimiting binary framing shared by the WAL and segment files.
//!
//! ## Frame Format
//! ```text
//! ┌──────────────┬──────────────┬───────────────┬──────────────────────┐
//! │ Len: u32 (4) │ CRC32: u32(4)│ HdrCRC: u32(4)│ Payload (Len bytes)  │
//! └──────────────┴──────────────┴───────────────┴──────────────────────┘
//! ```
//!
//! All integers are little-endian. CRC32 covers the payload; HdrCRC covers
//! the first eight header bytes, so a damaged length is caught before it is
//! trusted. Payloads are bincode-encoded serde values. Because every frame
//! carries its own length, a decoder walking a concatenated byte stream
//! consumes exactly one frame per call and reports how far it got.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StrataError};
use crate::memtable::Entry;

/// Frame header size: Len (4) + CRC (4) + HdrCRC (4)
pub const FRAME_HEADER_SIZE: usize = 12;

/// Key → value-or-tombstone mapping persisted by a segment
pub type Mapping = BTreeMap<Vec<u8>, Entry>;

/// Outcome of decoding one frame from the front of a buffer
#[derive(Debug, PartialEq, Eq)]
pub enum Frame<'a> {
    /// A whole, checksum-valid frame
    Complete { payload: &'a [u8], consumed: usize },

    /// The buffer ends before the header or the declared payload does
    ///
    /// Only reported for a header that passed its checksum, so the declared
    /// length really does run past the end of the buffer.
    Truncated,

    /// The frame is malformed: bad header checksum, bad payload checksum
    /// or zero length
    ///
    /// `consumed` is the declared frame size when the header is intact, and
    /// just the header size when it is not.
    Corrupt { consumed: usize },
}

// =============================================================================
// Framing
// =============================================================================

/// CRC32 of a payload
pub fn checksum(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// Wrap a payload in a length-prefixed, checksummed frame
///
/// Fails for payloads whose length does not fit the u32 length field.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        StrataError::Serialization(format!(
            "payload of {} bytes exceeds the frame limit of {} bytes",
            payload.len(),
            u32::MAX
        ))
    })?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&checksum(payload).to_le_bytes());
    let header_crc = checksum(&frame[0..8]);
    frame.extend_from_slice(&header_crc.to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Decode the frame at the start of `buf`
///
/// Never reads past the declared frame boundary.
pub fn decode_frame(buf: &[u8]) -> Frame<'_> {
    if buf.len() < FRAME_HEADER_SIZE {
        return Frame::Truncated;
    }

    if checksum(&buf[0..8]) != read_u32_le(buf, 8) {
        return Frame::Corrupt {
            consumed: FRAME_HEADER_SIZE,
        };
    }

    let len = read_u32_le(buf, 0) as usize;
    let crc = read_u32_le(buf, 4);

    let end = match FRAME_HEADER_SIZE.checked_add(len) {
        Some(end) if end <= buf.len() => end,
        _ => return Frame::Truncated,
    };

    // Encoders never emit empty payloads
    if len == 0 {
        return Frame::Corrupt { consumed: end };
    }

    let payload = &buf[FRAME_HEADER_SIZE..end];
    if checksum(payload) != crc {
        return Frame::Corrupt { consumed: end };
    }

    Frame::Complete {
        payload,
        consumed: end,
    }
}

fn read_u32_le(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

// =============================================================================
// Records
// =============================================================================

/// Serialize a single record (unframed)
pub fn encode_record<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    bincode::serialize(record).map_err(|e| StrataError::Serialization(e.to_string()))
}

/// Deserialize a single record from a frame payload
pub fn decode_record<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    bincode::deserialize(payload).map_err(|e| StrataError::Serialization(e.to_string()))
}

// =============================================================================
// Mappings
// =============================================================================

/// Encode a whole mapping as one frame
pub fn encode_mapping(mapping: &Mapping) -> Result<Vec<u8>> {
    let payload = encode_record(mapping)?;
    encode_frame(&payload)
}

/// Decode one mapping from the front of `buf`
///
/// Returns the mapping and the number of bytes it occupied, so callers can
/// continue decoding right after it.
pub fn decode_mapping(buf: &[u8]) -> Result<(Mapping, usize)> {
    match decode_frame(buf) {
        Frame::Complete { payload, consumed } => {
            let mapping = decode_record(payload).map_err(|e| {
                StrataError::CorruptSegment(format!("undecodable mapping: {}", e))
            })?;
            Ok((mapping, consumed))
        }
        Frame::Truncated => Err(StrataError::CorruptSegment(format!(
            "truncated mapping frame ({} bytes available)",
            buf.len()
        ))),
        Frame::Corrupt { .. } => Err(StrataError::CorruptSegment(
            "mapping frame checksum mismatch".to_string(),
        )),
    }
}
