//! Byte sources backing catalog records.
//!
//! Records never hold references into their archives; they carry an
//! [`EntryLocator`] whose `source` field indexes the merge's source arena.

use std::fs;
use std::path::PathBuf;

use veles_pak::{CompressionMethod, PakArchive, PakEntry};

use crate::Result;

/// Archive-relative reference sufficient to stream an entry's bytes later.
///
/// Immutable once built. The owning source must outlive every record that
/// holds the locator; the merge keeps all sources alive for the run.
#[derive(Debug, Clone)]
pub struct EntryLocator {
    /// Index of the owning source in the merge's arena.
    pub source: usize,
    /// Entry index within the owning archive (0 for loose files).
    pub index: u32,
    /// Raw offset of the stored bytes.
    pub offset: u64,
    /// Stored (possibly compressed) size.
    pub compressed_size: u64,
    /// Uncompressed size.
    pub size: u64,
    /// Resolved compression method.
    pub method: CompressionMethod,
    /// Whether the stored bytes are encrypted.
    pub encrypted: bool,
}

impl EntryLocator {
    /// Build a locator for a decoded container entry.
    pub fn for_pak_entry(source: usize, index: u32, entry: &PakEntry) -> Self {
        Self {
            source,
            index,
            offset: entry.offset,
            compressed_size: entry.compressed_size,
            size: entry.size,
            method: entry.method.clone(),
            encrypted: entry.encrypted,
        }
    }

    /// Build a locator for a loose file.
    pub fn for_loose_file(source: usize, size: u64) -> Self {
        Self {
            source,
            index: 0,
            offset: 0,
            compressed_size: size,
            size,
            method: CompressionMethod::Store,
            encrypted: false,
        }
    }
}

/// One opened input: a container archive or a loose file.
#[derive(Debug)]
pub enum Source {
    /// A decoded container archive.
    Pak(PakArchive),
    /// A loose file on disk.
    Loose {
        path: PathBuf,
        name: String,
        size: u64,
    },
}

impl Source {
    /// The source's file name, used in diagnostics and ordering.
    pub fn name(&self) -> &str {
        match self {
            Self::Pak(archive) => archive.name(),
            Self::Loose { name, .. } => name,
        }
    }

    /// Read the uncompressed bytes a locator points at.
    pub fn read(&self, locator: &EntryLocator) -> Result<Vec<u8>> {
        match self {
            Self::Pak(archive) => {
                let entry = PakEntry {
                    offset: locator.offset,
                    compressed_size: locator.compressed_size,
                    size: locator.size,
                    method: locator.method.clone(),
                    encrypted: locator.encrypted,
                    hash: [0; 20],
                };
                Ok(archive.read(&entry)?)
            }
            Self::Loose { path, .. } => Ok(fs::read(path)?),
        }
    }
}
