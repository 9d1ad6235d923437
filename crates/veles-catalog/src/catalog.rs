//! The deduplicating file catalog.
//!
//! Records live in an arena and are addressed by index; the lookup
//! structure is a two-level map keyed by lowercased directory, then
//! lowercased file name, storing arena indices. Case is preserved on the
//! records for display.

use std::hash::BuildHasherDefault;

use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;
use veles_package::PackageSummary;

use crate::EntryLocator;

type FxHashMap<K, V> = FastHashMap<K, V, BuildHasherDefault<FxHasher>>;

/// A canonical, deduplicated catalog entry.
#[derive(Debug)]
pub struct CatalogRecord {
    /// Normalized directory path (mount-point-prefixed, no trailing slash).
    pub directory: String,
    /// Bare leaf file name.
    pub filename: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Where to stream the bytes from.
    pub locator: EntryLocator,
    /// Parsed package summary, attached by the scan pass.
    pub package: Option<PackageSummary>,
    /// True once consumed as the data half of a split file; excluded from
    /// the final listing.
    pub used: bool,
    /// Record index of the split-file data sibling, if paired.
    pub data_sibling: Option<usize>,
}

impl CatalogRecord {
    /// Whether the scan pass recognized this record as a package.
    #[inline]
    pub fn is_package(&self) -> bool {
        self.package.is_some()
    }

    /// The record's file extension, if any.
    pub fn extension(&self) -> Option<&str> {
        self.filename.rsplit_once('.').map(|(_, ext)| ext)
    }
}

/// What happened when a registration hit the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The path was new; a record was created.
    Inserted,
    /// A later archive replaced an earlier archive's record (patch
    /// override, last write wins).
    Overridden,
    /// A duplicate within one archive's own entry list; the first
    /// occurrence wins and the rest indicate a malformed index.
    KeptFirst,
}

/// The run-scoped file catalog.
#[derive(Debug, Default)]
pub struct Catalog {
    records: Vec<CatalogRecord>,
    index: FxHashMap<String, FxHashMap<String, usize>>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry under its (directory, filename) identity.
    ///
    /// Returns the record's arena index and what happened. Registration
    /// order is the correctness contract: archives must be fed in ascending
    /// case-insensitive name order so that override semantics match patch
    /// ordering.
    pub fn register(
        &mut self,
        directory: String,
        filename: String,
        size: u64,
        locator: EntryLocator,
    ) -> (usize, RegisterOutcome) {
        let dir_key = directory.to_ascii_lowercase();
        let name_key = filename.to_ascii_lowercase();

        if let Some(&idx) = self.index.get(&dir_key).and_then(|d| d.get(&name_key)) {
            let record = &mut self.records[idx];
            if record.locator.source == locator.source {
                // Same archive registering the same path twice: malformed
                // index, first occurrence wins.
                return (idx, RegisterOutcome::KeptFirst);
            }
            record.locator = locator;
            record.size = size;
            return (idx, RegisterOutcome::Overridden);
        }

        let idx = self.records.len();
        self.records.push(CatalogRecord {
            directory,
            filename,
            size,
            locator,
            package: None,
            used: false,
            data_sibling: None,
        });
        self.index
            .entry(dir_key)
            .or_default()
            .insert(name_key, idx);
        (idx, RegisterOutcome::Inserted)
    }

    /// Look up a record index by (directory, filename), case-insensitively.
    pub fn lookup(&self, directory: &str, filename: &str) -> Option<usize> {
        self.index
            .get(&directory.to_ascii_lowercase())?
            .get(&filename.to_ascii_lowercase())
            .copied()
    }

    /// Get a record by arena index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&CatalogRecord> {
        self.records.get(index)
    }

    /// Get a mutable record by arena index.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut CatalogRecord> {
        self.records.get_mut(index)
    }

    /// All records in registration order.
    #[inline]
    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
