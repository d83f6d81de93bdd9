//! SSTable Cursor
//!
//! Sequential, seekable iteration over all entries of one SSTable.
//!
//! The cursor keeps a single decoded block as its working set and reads
//! blocks straight from the file; it does not use the reader's block cache.

use std::sync::Arc;

use crate::error::Result;
use crate::storage::block::Block;
use crate::storage::cursor::{Cursor, Entry};

use super::reader::OpenTable;

/// Cursor over one SSTable in ascending key order
pub struct SSTableCursor {
    table: Arc<OpenTable>,
    /// Block the cursor points into; `>= block_count` means exhausted
    block_index: usize,
    /// Entry within the block
    offset: usize,
    /// Decoded block at `block_index`, loaded on demand
    block: Option<Block>,
}

impl SSTableCursor {
    pub(super) fn new(table: Arc<OpenTable>) -> Self {
        Self {
            table,
            block_index: 0,
            offset: 0,
            block: None,
        }
    }

    /// Make sure the block at the current position is loaded, rolling over
    /// to the next block when the current one is used up. Returns false once
    /// the cursor has run off the end of the table.
    fn ensure_block(&mut self) -> Result<bool> {
        loop {
            if self.block_index >= self.table.block_count() {
                return Ok(false);
            }

            let len = match &self.block {
                Some(block) => block.len(),
                None => {
                    let block = self.table.read_block(self.block_index)?;
                    let len = block.len();
                    self.block = Some(block);
                    len
                }
            };

            if self.offset < len {
                return Ok(true);
            }

            self.block_index += 1;
            self.offset = 0;
            self.block = None;
        }
    }
}

impl Cursor for SSTableCursor {
    fn next(&mut self) -> Result<Option<Entry>> {
        if !self.ensure_block()? {
            return Ok(None);
        }
        let entry = self
            .block
            .as_ref()
            .and_then(|block| block.entries().get(self.offset))
            .cloned();
        self.offset += 1;
        Ok(entry)
    }

    fn seek(&mut self, key: &[u8]) -> Result<()> {
        // Before the first block: the first entry of the table is the answer
        let block_index = self.table.block_idx(key).unwrap_or(0);

        if self.block_index != block_index {
            self.block = None;
        }
        self.block_index = block_index;
        self.offset = 0;

        if self.block_index >= self.table.block_count() {
            return Ok(());
        }
        if self.block.is_none() {
            self.block = Some(self.table.read_block(self.block_index)?);
        }

        // Landing at the end of the block makes the next call roll over
        self.offset = self
            .block
            .as_ref()
            .map_or(0, |block| block.lower_bound(key));
        Ok(())
    }
}
