//! Error types for LayerKV
//!
//! Provides a unified error type for all storage operations.
//!
//! A full block is *not* an error: [`crate::storage::Admission::Full`] is the
//! control signal that tells a table writer to flush and retry.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using LayerError
pub type Result<T> = std::result::Result<T, LayerError>;

/// Unified error type for LayerKV operations
#[derive(Debug, Error)]
pub enum LayerError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Write-path Errors
    // -------------------------------------------------------------------------
    /// A key was added that is not strictly greater than the previous one.
    #[error("Ordering violation: {0}")]
    OrderingViolation(String),

    /// A key or value does not fit in a 32-bit length field.
    #[error("Field too large: {field} is {len} bytes (limit {limit})", limit = u32::MAX)]
    OversizeField { field: &'static str, len: usize },

    #[error("Table already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Cannot finalize a table with no records")]
    EmptyTable,

    // -------------------------------------------------------------------------
    // Read-path Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt table: {0}")]
    CorruptTable(String),

    // -------------------------------------------------------------------------
    // API Misuse
    // -------------------------------------------------------------------------
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl LayerError {
    /// Build an ordering error naming both keys.
    pub(crate) fn ordering(previous: &[u8], key: &[u8]) -> Self {
        LayerError::OrderingViolation(format!(
            "key {:?} added after {:?}",
            String::from_utf8_lossy(key),
            String::from_utf8_lossy(previous)
        ))
    }

    /// Classify an I/O error raised while reading a table: short reads mean
    /// the file is truncated, everything else stays an I/O error.
    pub(crate) fn from_table_read(err: std::io::Error, what: &str) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            LayerError::CorruptTable(format!("short read of {}", what))
        } else {
            LayerError::Io(err)
        }
    }
}
