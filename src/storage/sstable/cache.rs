//! Block cache
//!
//! Small bounded set of decoded blocks keyed by block index. Eviction is
//! FIFO: the oldest inserted block is dropped first.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::storage::block::Block;

pub(crate) struct BlockCache {
    capacity: usize,
    blocks: VecDeque<(usize, Arc<Block>)>,
}

impl BlockCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            blocks: VecDeque::with_capacity(capacity),
        }
    }

    pub(crate) fn get(&self, idx: usize) -> Option<Arc<Block>> {
        self.blocks
            .iter()
            .find(|(i, _)| *i == idx)
            .map(|(_, block)| Arc::clone(block))
    }

    pub(crate) fn insert(&mut self, idx: usize, block: Arc<Block>) {
        if self.capacity == 0 || self.blocks.iter().any(|(i, _)| *i == idx) {
            return;
        }
        while self.blocks.len() >= self.capacity {
            self.blocks.pop_front();
        }
        self.blocks.push_back((idx, block));
    }

    pub(crate) fn len(&self) -> usize {
        self.blocks.len()
    }

    pub(crate) fn clear(&mut self) {
        self.blocks.clear();
    }
}
