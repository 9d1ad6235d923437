//! Error types for the catalog crate.

use thiserror::Error;

/// Errors that can occur while building or querying the catalog.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Container archive error.
    #[error("{0}")]
    Pak(#[from] veles_pak::Error),

    /// Package summary error.
    #[error("{0}")]
    Package(#[from] veles_package::Error),

    /// A record index does not exist in the catalog.
    #[error("no catalog record at index {0}")]
    RecordNotFound(usize),
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;
