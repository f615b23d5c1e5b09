//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use serde::{Deserialize, Serialize};

use crate::codec::{self, Frame};
use crate::error::{Result, StrataError};

/// Size of the frame header preceding every entry's payload
pub const HEADER_SIZE: usize = codec::FRAME_HEADER_SIZE;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing within a log
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

impl Operation {
    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
        }
    }
}

impl WalEntry {
    pub fn new(lsn: u64, operation: Operation) -> Self {
        Self { lsn, operation }
    }

    /// Encode as one length-prefixed, checksummed frame
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = codec::encode_record(self)?;
        codec::encode_frame(&payload)
    }

    /// Decode an entry from a buffer holding exactly one frame
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        match codec::decode_frame(bytes) {
            Frame::Complete { payload, consumed } => {
                if consumed != bytes.len() {
                    return Err(StrataError::CorruptWalRecord(format!(
                        "{} trailing bytes after entry",
                        bytes.len() - consumed
                    )));
                }
                Self::from_payload(payload)
            }
            Frame::Truncated => Err(StrataError::CorruptWalRecord(format!(
                "truncated entry ({} bytes)",
                bytes.len()
            ))),
            Frame::Corrupt { .. } => Err(StrataError::CorruptWalRecord(
                "checksum mismatch".to_string(),
            )),
        }
    }

    /// Decode an entry from an already verified frame payload
    pub(crate) fn from_payload(payload: &[u8]) -> Result<Self> {
        codec::decode_record(payload)
            .map_err(|e| StrataError::CorruptWalRecord(format!("undecodable entry: {}", e)))
    }
}
