//! MemTable Module
//!
//! In-memory write buffer that flushes to an SSTable.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory (last write wins)
//! - Track aggregate key + value bytes for flush triggers
//! - Ordered serialization into a new SSTable
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock:
//! - Keys ordered byte-wise, which is exactly the SSTable order
//! - Many concurrent readers, one writer at a time

mod table;

pub use table::MemTable;
