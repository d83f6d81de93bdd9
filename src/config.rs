//! Configuration for LayerKV
//!
//! Centralized tuning knobs with defaults matching the on-disk format.

use crate::storage::BLOCK_SIZE_TARGET;

/// Default number of decoded blocks a reader keeps for point lookups
pub const DEFAULT_BLOCK_CACHE_CAPACITY: usize = 4;

/// Tuning for table writers and readers
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Write Path
    // -------------------------------------------------------------------------
    /// Soft size target for data and index blocks (in bytes).
    /// The first record of a block is always admitted regardless of size.
    pub block_size_target: usize,

    // -------------------------------------------------------------------------
    // Read Path
    // -------------------------------------------------------------------------
    /// Number of decoded blocks cached per reader (FIFO eviction).
    /// Only point lookups consult this cache.
    pub block_cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size_target: BLOCK_SIZE_TARGET, // 128 KiB
            block_cache_capacity: DEFAULT_BLOCK_CACHE_CAPACITY,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the soft block size target (in bytes)
    pub fn block_size_target(mut self, size: usize) -> Self {
        self.config.block_size_target = size;
        self
    }

    /// Set how many decoded blocks each reader caches
    pub fn block_cache_capacity(mut self, count: usize) -> Self {
        self.config.block_cache_capacity = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
