//! # StrataKV
//!
//! An embeddable, crash-safe key-value store with:
//! - Write-Ahead Logging (WAL) for durability
//! - Crash recovery with partial write handling
//! - Immutable segment tables written atomically on flush
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Engine                                 │
//! │        put / delete (exclusive)   get (shared)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  MemTable   │
//!   │  (Append)   │          │ (BTreeMap)  │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ flush at threshold
//!                                   ▼
//!                           ┌───────────────┐
//!                           │   Segments    │
//!                           │ (newest wins) │
//!                           └───────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use stratakv::Engine;
//!
//! # fn main() -> stratakv::Result<()> {
//! let engine = Engine::open_path("./data")?;
//! engine.put("key1", "value1")?;
//! assert_eq!(engine.get("key1")?, Some(b"value1".to_vec()));
//! engine.delete("key1")?;
//! assert_eq!(engine.get("key1")?, None);
//! engine.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod wal;
pub mod memtable;
pub mod storage;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StrataError, Result};
pub use config::Config;
pub use engine::{Engine, EngineState};
pub use memtable::Entry;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of StrataKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
