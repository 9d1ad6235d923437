//! Error types for the package crate.

use thiserror::Error;

/// Errors that can occur while scanning a package summary.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] veles_common::Error),

    /// Invalid package magic bytes.
    #[error("invalid package magic: expected {expected:#010x}, got {actual:#010x}")]
    InvalidMagic { expected: u32, actual: u32 },

    /// A table offset or count does not fit the package data.
    #[error("malformed package table: {0}")]
    MalformedTable(String),

    /// A name-table or package index points outside its table.
    #[error("index out of range: {0}")]
    IndexOutOfRange(String),
}

/// Result type for package operations.
pub type Result<T> = std::result::Result<T, Error>;
