//! Error types for the archive crate.

use thiserror::Error;

/// Errors that can occur when opening or reading a tile archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// I/O error reading the tree file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the tree magic.
    #[error("Invalid tree file magic: {0:02x?}")]
    BadMagic([u8; 4]),

    /// The file ended before a structure could be read completely.
    #[error("Tree file truncated: needed {needed} bytes at offset {offset}")]
    Truncated {
        /// Byte offset of the structure.
        offset: u64,
        /// Bytes required.
        needed: u64,
    },

    /// Header fields are inconsistent.
    #[error("Invalid tree header: {0}")]
    InvalidHeader(String),

    /// A node's compressed block could not be inflated.
    #[error("Failed to inflate node {index}: {source}")]
    Inflate {
        /// Table-of-contents index of the node.
        index: u32,
        /// Underlying decompression error.
        #[source]
        source: std::io::Error,
    },

    /// A node inflated to a different size than its table-of-contents entry declares.
    #[error("Node {index} inflated to {actual} bytes (expected {expected})")]
    SizeMismatch {
        /// Table-of-contents index of the node.
        index: u32,
        /// Size declared in the table of contents.
        expected: u32,
        /// Size actually produced.
        actual: usize,
    },
}

impl ArchiveError {
    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        ArchiveError::InvalidHeader(message.into())
    }
}
