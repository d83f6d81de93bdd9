//! SSTable Module
//!
//! Sorted String Table - immutable on-disk sorted key-value storage.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Data Blocks (variable)                                  │
//! │   records of the table, ascending keys                  │
//! │   (see `storage::block` for the record layout)          │
//! ├─────────────────────────────────────────────────────────┤
//! │ Index Blocks (variable)                                 │
//! │   ordinary blocks whose records are                     │
//! │   key   = first key of a data block                     │
//! │   value = [0u8; 2] ++ data block offset (u48 BE)        │
//! ├─────────────────────────────────────────────────────────┤
//! │ Trailer (N * 6 + 4 bytes)                               │
//! │   IndexBlockOffset: u48 BE  ... repeated N times ...    │
//! │   N: u32 BE                                             │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod builder;
mod cache;
mod iterator;
mod reader;

use std::path::PathBuf;

pub use builder::SSTableBuilder;
pub use iterator::SSTableCursor;
pub use reader::SSTableReader;

use crate::error::{LayerError, Result};

// =============================================================================
// Shared Constants (used by builder, reader, iterator)
// =============================================================================

/// Width of an on-disk file offset (48-bit big-endian)
pub(crate) const OFFSET_SIZE: usize = 6;

/// Size of an index record value: 2 reserved bytes + 6 offset bytes
pub(crate) const INDEX_VALUE_SIZE: usize = 8;

/// Size of the index-block count at the very end of the file
pub(crate) const COUNT_SIZE: usize = 4;

/// Largest offset representable in 48 bits
pub(crate) const MAX_OFFSET: u64 = (1 << 48) - 1;

// =============================================================================
// Offset Codec
// =============================================================================

/// Append `offset` as a 6-byte big-endian integer.
pub(crate) fn put_offset(buf: &mut Vec<u8>, offset: u64) -> Result<()> {
    if offset > MAX_OFFSET {
        return Err(LayerError::OversizeField {
            field: "file offset",
            len: offset as usize,
        });
    }
    buf.extend_from_slice(&offset.to_be_bytes()[2..]);
    Ok(())
}

/// Read a 6-byte big-endian integer.
pub(crate) fn read_offset(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(OFFSET_SIZE)
        .fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Encode a data-block offset as an index record value.
pub(crate) fn encode_index_value(offset: u64) -> Result<Vec<u8>> {
    let mut value = vec![0u8; 2];
    put_offset(&mut value, offset)?;
    Ok(value)
}

/// Decode an index record value back into a data-block offset.
pub(crate) fn decode_index_value(value: &[u8]) -> Result<u64> {
    if value.len() != INDEX_VALUE_SIZE {
        return Err(LayerError::CorruptTable(format!(
            "index value is {} bytes, expected {}",
            value.len(),
            INDEX_VALUE_SIZE
        )));
    }
    Ok(read_offset(&value[2..]))
}

// =============================================================================
// SSTable Metadata
// =============================================================================

/// Summary of a finalized table, returned by [`SSTableBuilder::close`].
#[derive(Debug, Clone)]
pub struct SSTable {
    /// Path to the SSTable file
    pub path: PathBuf,
    /// Number of records in the data blocks
    pub entry_count: u64,
    /// Number of data blocks
    pub data_block_count: usize,
    /// Number of index blocks
    pub index_block_count: usize,
    /// Smallest key
    pub min_key: Vec<u8>,
    /// Largest key
    pub max_key: Vec<u8>,
    /// File size in bytes
    pub file_size: u64,
}

impl SSTable {
    /// Get the number of entries
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Quick check if a key might be in this SSTable (range check)
    /// Returns false if key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        key >= self.min_key.as_slice() && key <= self.max_key.as_slice()
    }
}
