//! Structured diagnostics collected during a merge.
//!
//! None of these abort the run; they are surfaced to the caller alongside
//! the finished catalog and mirrored to the log as they occur.

use std::fmt;
use std::path::PathBuf;

/// A non-fatal condition observed while building the catalog.
#[derive(Debug, Clone)]
pub enum Diagnostic {
    /// An input path could not be opened or decoded; the run continued.
    ArchiveSkipped { path: PathBuf, reason: String },
    /// An archive's decoded directory contradicted its own declared file
    /// count; none of its entries were registered.
    ArchiveCorrupt { path: PathBuf, reason: String },
    /// One archive registered the same path twice; the first occurrence
    /// won.
    DuplicateEntry {
        directory: String,
        filename: String,
        archive: String,
    },
    /// A later archive replaced an earlier archive's entry (patch
    /// override).
    EntryOverridden {
        directory: String,
        filename: String,
        winner: String,
    },
    /// A package-typed record failed to parse and stays a plain file.
    PackageParseFailed {
        directory: String,
        filename: String,
        reason: String,
    },
    /// A header-only package has no data sibling in the catalog.
    MissingSplitSibling { directory: String, filename: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArchiveSkipped { path, reason } => {
                write!(f, "skipping \"{}\": {reason}", path.display())
            }
            Self::ArchiveCorrupt { path, reason } => {
                write!(f, "discarding \"{}\": {reason}", path.display())
            }
            Self::DuplicateEntry {
                directory,
                filename,
                archive,
            } => write!(
                f,
                "duplicate entry {directory}/{filename} in \"{archive}\", keeping the first"
            ),
            Self::EntryOverridden {
                directory,
                filename,
                winner,
            } => write!(f, "{directory}/{filename} overridden by \"{winner}\""),
            Self::PackageParseFailed {
                directory,
                filename,
                reason,
            } => write!(
                f,
                "{directory}/{filename} is not a readable package: {reason}"
            ),
            Self::MissingSplitSibling {
                directory,
                filename,
            } => write!(
                f,
                "{directory}/{filename} is header-only but has no data sibling"
            ),
        }
    }
}
