//! Storage Module
//!
//! Persistent storage layer: immutable, block-encoded SSTables and the
//! cursors that read them back.
//!
//! ## Responsibilities
//! - Encode sorted records into size-bounded blocks
//! - Write and read finalized SSTable files with a two-level index
//! - Point lookups through a bounded block cache
//! - Sequential and seekable iteration over one table or a merged view
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Data Blocks                            │
//! │ ┌──────┬──────┬──────┬─────┬────────┐ │
//! │ │Shared│KeyLen│ValLen│ Key │ Snappy │ │
//! │ │ =0   │      │      │     │ (Value)│ │
//! │ └──────┴──────┴──────┴─────┴────────┘ │
//! │ ... records ..., then u32 = 0          │
//! ├────────────────────────────────────────┤
//! │ Index Blocks                           │
//! │   (first key → data block offset)      │
//! ├────────────────────────────────────────┤
//! │ Trailer                                │
//! │ ┌───────────────────────┬───────────┐ │
//! │ │ Index Offsets (u48 *N)│  N (u32)  │ │
//! │ └───────────────────────┴───────────┘ │
//! └────────────────────────────────────────┘
//! ```
//! All integers are big-endian.

mod block;
mod cursor;
mod merge;
mod sstable;

pub use block::{Admission, Block, BlockBuilder, BLOCK_SIZE_TARGET};
pub use cursor::{Cursor, Entry};
pub use merge::{BoxedCursor, MergeCursor, MergedTable};
pub use sstable::{SSTable, SSTableBuilder, SSTableCursor, SSTableReader};
