//! Error types for the pak crate.

use thiserror::Error;

/// Errors that can occur when working with container archives.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] veles_common::Error),

    /// Could not find the archive footer.
    #[error("could not find archive footer record")]
    FooterNotFound,

    /// Invalid footer magic bytes.
    #[error("invalid footer magic: expected {expected:#010x}, got {actual:#010x}")]
    InvalidMagic { expected: u32, actual: u32 },

    /// Unsupported container format version.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u32),

    /// Compression method index does not resolve against the footer table.
    #[error("unsupported compression method index: {0}")]
    UnsupportedMethod(u32),

    /// None of the candidate keys decrypts the index.
    ///
    /// Non-fatal at the run level: the archive is skipped.
    #[error("no candidate key decrypts the index")]
    KeyNotFound,

    /// The archive only carries the path-hash sub-index.
    ///
    /// Non-fatal at the run level: the archive is skipped.
    #[error("archive has no full directory index")]
    MissingFullIndex,

    /// Decoded directory disagrees with the declared file count.
    ///
    /// Fatal for this archive: none of its entries can be trusted.
    #[error("directory file count mismatch: declared {declared}, decoded {decoded}")]
    CountMismatch { declared: u32, decoded: u32 },

    /// Malformed index data.
    #[error("malformed index: {0}")]
    InvalidIndex(String),

    /// Invalid candidate key string.
    #[error("invalid AES key: {0}")]
    InvalidKey(String),

    /// Decryption error.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// Decompression error.
    #[error("decompression error: {0}")]
    Decompression(String),
}

impl Error {
    /// Whether this failure means the archive's decoded data cannot be
    /// trusted at all, as opposed to an ordinary skip condition.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CountMismatch { .. })
    }
}

/// Result type for pak operations.
pub type Result<T> = std::result::Result<T, Error>;
