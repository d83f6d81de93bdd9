//! # LayerKV
//!
//! Storage core of a log-structured key-value engine:
//! - Block-encoded, immutable SSTables with a two-level index
//! - Lazy table readers with a bounded block cache
//! - Seekable cursors over one table or a priority-ordered merge
//! - An in-memory MemTable that flushes to an SSTable
//!
//! ## Architecture Overview
//!
//! ```text
//!   ┌─────────────┐   save    ┌───────────────┐
//!   │  MemTable   │──────────▶│ SSTableBuilder│
//!   │  (RwLock)   │           └───────┬───────┘
//!   └─────────────┘                   │ blocks
//!                                     ▼
//!                             ┌───────────────┐
//!                             │  .sst files   │
//!                             └───────┬───────┘
//!                                     │
//!                 ┌───────────────────┴───────────────────┐
//!                 ▼                                       ▼
//!         ┌───────────────┐                       ┌───────────────┐
//!         │ SSTableReader │  × N  ───────────────▶│  MergedTable  │
//!         │ (block cache) │                       │ (priority)    │
//!         └───────┬───────┘                       └───────┬───────┘
//!                 ▼                                       ▼
//!         ┌───────────────┐                       ┌───────────────┐
//!         │ SSTableCursor │                       │  MergeCursor  │
//!         └───────────────┘                       └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod memtable;
pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LayerError, Result};
pub use config::Config;
pub use memtable::MemTable;
pub use storage::{Cursor, MergedTable, SSTableBuilder, SSTableReader};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LayerKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
