//! Error types for StrataKV
//!
//! Provides a unified error type for all operations.
//!
//! A missing key is not an error: lookups return `Ok(None)`.

use thiserror::Error;

use crate::engine::EngineState;

/// Result type alias using StrataError
pub type Result<T> = std::result::Result<T, StrataError>;

/// Unified error type for StrataKV operations
#[derive(Debug, Error)]
pub enum StrataError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // On-disk Corruption
    // -------------------------------------------------------------------------
    #[error("Corrupt segment: {0}")]
    CorruptSegment(String),

    #[error("Corrupt WAL record: {0}")]
    CorruptWalRecord(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Engine is not open (state: {0:?})")]
    NotOpen(EngineState),
}

impl StrataError {
    /// True for errors caused by malformed bytes on disk
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            StrataError::CorruptSegment(_) | StrataError::CorruptWalRecord(_)
        )
    }
}
