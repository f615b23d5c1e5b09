//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs;
use std::path::Path;

use crate::codec::{self, Frame};
use crate::error::{Result, StrataError};

use super::WalEntry;

/// How the readable part of a log ended before end-of-file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailKind {
    /// Partial header or payload (crash mid-append)
    Truncated,

    /// Last frame fully present but failing its checksum, or a zeroed tail
    Torn,
}

/// Reads entries from the WAL file
///
/// The log is bounded by the flush threshold, so it is read into memory
/// once and walked frame by frame.
pub struct WalReader {
    data: Vec<u8>,

    /// Offset just past the last valid entry
    position: usize,

    /// Set once an invalid tail has been seen
    tail: Option<TailKind>,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_bytes(fs::read(path)?))
    }

    /// Read entries from an in-memory copy of a log
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            position: 0,
            tail: None,
        }
    }

    /// Read the next entry from the WAL
    ///
    /// `Ok(None)` at end of file and at an invalid tail. A bad frame that is
    /// followed by anything but zero bytes cannot be a torn write and is
    /// reported as corruption. A header failing its checksum counts as bad
    /// from its first byte on, since its length cannot be trusted.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        if self.tail.is_some() || self.position >= self.data.len() {
            return Ok(None);
        }

        let rest = &self.data[self.position..];
        match codec::decode_frame(rest) {
            Frame::Complete { payload, consumed } => {
                let entry = WalEntry::from_payload(payload).map_err(|e| {
                    StrataError::CorruptWalRecord(format!("offset {}: {}", self.position, e))
                })?;
                self.position += consumed;
                Ok(Some(entry))
            }
            // The header checksum held, so the declared length is real and
            // the frame runs past end of file
            Frame::Truncated => {
                self.tail = Some(TailKind::Truncated);
                Ok(None)
            }
            Frame::Corrupt { consumed } => {
                if rest[consumed..].iter().all(|&b| b == 0) {
                    self.tail = Some(TailKind::Torn);
                    Ok(None)
                } else {
                    Err(StrataError::CorruptWalRecord(format!(
                        "bad frame at offset {} followed by {} more bytes",
                        self.position,
                        rest.len() - consumed
                    )))
                }
            }
        }
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            failed: false,
        }
    }

    /// Length of the valid prefix read so far
    pub fn valid_len(&self) -> u64 {
        self.position as u64
    }

    /// Total bytes in the log
    pub fn total_len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Bytes past the valid prefix (meaningful once reading has stopped)
    pub fn discarded_bytes(&self) -> u64 {
        self.total_len() - self.valid_len()
    }

    /// How the log ended, if not cleanly
    pub fn tail(&self) -> Option<TailKind> {
        self.tail
    }
}

/// Iterator over WAL entries
///
/// Yields at most one error, then stops.
pub struct WalIterator {
    reader: WalReader,
    failed: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.next_entry() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
